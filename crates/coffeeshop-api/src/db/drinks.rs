//! Drink persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `drinks` table. Ids are
//! assigned by the database. The recipe column holds the full ingredient
//! list as JSONB.

use coffeeshop_core::{Drink, DrinkTitle, Recipe};
use sqlx::PgPool;

use crate::state::{DrinkError, StoreError};

fn encode_recipe(recipe: &Recipe) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(recipe).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize recipe");
        StoreError::Database(sqlx::Error::Encode(Box::new(e)))
    })
}

/// Map a unique-constraint violation on `title` to a duplicate-title error.
/// Anything else stays a database failure.
fn classify(err: sqlx::Error, title: &DrinkTitle) -> DrinkError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DrinkError::DuplicateTitle(title.to_string())
        }
        _ => DrinkError::Store(StoreError::Database(err)),
    }
}

/// Insert a new drink, returning its id.
pub async fn insert(pool: &PgPool, title: &DrinkTitle, recipe: &Recipe) -> Result<i64, DrinkError> {
    let recipe_json = encode_recipe(recipe)?;

    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO drinks (title, recipe) VALUES ($1, $2) RETURNING id")
            .bind(title.as_str())
            .bind(&recipe_json)
            .fetch_one(pool)
            .await
            .map_err(|e| classify(e, title))?;

    Ok(id)
}

/// Overwrite title and recipe. Returns `false` if no row has the id.
pub async fn update(pool: &PgPool, drink: &Drink) -> Result<bool, DrinkError> {
    let recipe_json = encode_recipe(&drink.recipe)?;

    let result = sqlx::query(
        "UPDATE drinks SET title = $1, recipe = $2, updated_at = now() WHERE id = $3",
    )
    .bind(drink.title.as_str())
    .bind(&recipe_json)
    .bind(drink.id)
    .execute(pool)
    .await
    .map_err(|e| classify(e, &drink.title))?;

    Ok(result.rows_affected() > 0)
}

/// Delete a drink. Returns `false` if no row has the id.
pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM drinks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all drinks, ordered by id.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Drink>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DrinkRow>("SELECT id, title, recipe FROM drinks ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().filter_map(DrinkRow::into_drink).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DrinkRow {
    id: i64,
    title: String,
    recipe: serde_json::Value,
}

impl DrinkRow {
    /// Rows that no longer validate are skipped and logged rather than
    /// failing startup.
    fn into_drink(self) -> Option<Drink> {
        let title = DrinkTitle::new(self.title);
        let recipe = serde_json::from_value::<Recipe>(self.recipe);
        match (title, recipe) {
            (Ok(title), Ok(recipe)) => Some(Drink {
                id: self.id,
                title,
                recipe,
            }),
            (title, recipe) => {
                tracing::error!(
                    id = self.id,
                    title_error = ?title.err(),
                    recipe_error = ?recipe.err().map(|e| e.to_string()),
                    "invalid drink row in database; skipping"
                );
                None
            }
        }
    }
}
