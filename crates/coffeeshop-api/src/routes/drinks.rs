//! # Drinks API
//!
//! The menu. Reading the public menu is open; every other endpoint is wrapped
//! with [`require_scope`] and the permission it needs.
//!
//! ## Endpoints
//!
//! - `GET /drinks`: public menu, short view
//! - `GET /drinks-detail`: staff view, long view (`get:drinks-detail`)
//! - `POST /drinks`: add a drink (`post:drinks`)
//! - `PATCH /drinks/:id`: change title and/or recipe (`patch:drinks`)
//! - `DELETE /drinks/:id`: remove a drink (`delete:drinks`)
//!
//! The guard runs before any path, body, or store work, so an unauthorized
//! caller learns nothing about which ids exist.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::handler::Handler;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch};
use axum::{Json, Router};
use coffeeshop_auth::{scope, TokenVerifier};
use coffeeshop_core::{Drink, DrinkTitle, LongDrink, Recipe, ShortDrink};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{require_scope, Authorized, ScopeGuard};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to add a drink. Title and recipe rules are enforced on parse.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDrinkRequest {
    /// Unique, 1 to 80 characters.
    #[schema(value_type = String, example = "latte")]
    pub title: DrinkTitle,
    /// One ingredient object or a non-empty array of them.
    #[schema(value_type = Vec<Object>)]
    pub recipe: Recipe,
}

/// Partial update. At least one field must be present.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDrinkRequest {
    /// New title.
    #[schema(value_type = Option<String>)]
    pub title: Option<DrinkTitle>,
    /// New recipe.
    #[schema(value_type = Option<Vec<Object>>)]
    pub recipe: Option<Recipe>,
}

impl Validate for UpdateDrinkRequest {
    fn validate(&self) -> Result<(), String> {
        if self.title.is_none() && self.recipe.is_none() {
            return Err("request must update title or recipe".to_string());
        }
        Ok(())
    }
}

/// Public menu.
#[derive(Debug, Serialize, ToSchema)]
pub struct MenuResponse {
    pub success: bool,
    /// `{id, title, recipe: [{color, parts}]}` per drink.
    #[schema(value_type = Vec<Object>)]
    pub drinks: Vec<ShortDrink>,
}

/// Staff view of one or more drinks.
#[derive(Debug, Serialize, ToSchema)]
pub struct DetailResponse {
    pub success: bool,
    /// `{id, title, recipe: [{name, color, parts}]}` per drink.
    #[schema(value_type = Vec<Object>)]
    pub drinks: Vec<LongDrink>,
}

impl DetailResponse {
    fn of(drinks: impl IntoIterator<Item = Drink>) -> Json<Self> {
        Json(Self {
            success: true,
            drinks: drinks.into_iter().map(|d| d.long()).collect(),
        })
    }
}

/// Confirmation of a deletion.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    /// Id of the removed drink.
    pub delete: i64,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the drinks router, guarding each write and the detail view with
/// its own scope.
pub fn router(verifier: Arc<TokenVerifier>) -> Router<AppState> {
    let guard = |required| ScopeGuard::new(Arc::clone(&verifier), required);

    Router::new()
        .route(
            "/drinks",
            get(list_drinks).post(create_drink.layer(from_fn_with_state(
                guard(scope::POST_DRINKS),
                require_scope,
            ))),
        )
        .route(
            "/drinks-detail",
            get(get_drinks_detail.layer(from_fn_with_state(
                guard(scope::GET_DRINKS_DETAIL),
                require_scope,
            ))),
        )
        .route(
            "/drinks/:id",
            patch(update_drink.layer(from_fn_with_state(
                guard(scope::PATCH_DRINKS),
                require_scope,
            )))
            .delete(delete_drink.layer(from_fn_with_state(
                guard(scope::DELETE_DRINKS),
                require_scope,
            ))),
        )
}

/// Ids that are not integers name no drink.
fn drink_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id).map_err(|_| AppError::NotFound)
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /drinks: Public menu.
#[utoipa::path(
    get,
    path = "/drinks",
    responses(
        (status = 200, description = "Every drink, short view", body = MenuResponse),
    ),
    tag = "drinks"
)]
async fn list_drinks(State(state): State<AppState>) -> Json<MenuResponse> {
    Json(MenuResponse {
        success: true,
        drinks: state.drinks.list().iter().map(Drink::short).collect(),
    })
}

/// GET /drinks-detail: Full recipes.
#[utoipa::path(
    get,
    path = "/drinks-detail",
    responses(
        (status = 200, description = "Every drink, long view", body = DetailResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Token lacks get:drinks-detail", body = crate::error::ErrorBody),
    ),
    security(("bearer" = ["get:drinks-detail"])),
    tag = "drinks"
)]
async fn get_drinks_detail(
    State(state): State<AppState>,
    Authorized(caller): Authorized,
) -> Json<DetailResponse> {
    tracing::debug!(sub = ?caller.subject(), "serving drink detail");
    DetailResponse::of(state.drinks.list())
}

/// POST /drinks: Add a drink.
#[utoipa::path(
    post,
    path = "/drinks",
    request_body = CreateDrinkRequest,
    responses(
        (status = 200, description = "Drink created", body = DetailResponse),
        (status = 400, description = "Body is not JSON", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Token lacks post:drinks", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid drink or duplicate title", body = crate::error::ErrorBody),
    ),
    security(("bearer" = ["post:drinks"])),
    tag = "drinks"
)]
async fn create_drink(
    State(state): State<AppState>,
    Authorized(caller): Authorized,
    body: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DetailResponse>, AppError> {
    let req = extract_json(body)?;
    let drink = state.create_drink(req.title, req.recipe).await?;

    tracing::info!(id = drink.id, title = %drink.title, sub = ?caller.subject(), "drink created");
    Ok(DetailResponse::of([drink]))
}

/// PATCH /drinks/:id: Change a drink's title and/or recipe.
#[utoipa::path(
    patch,
    path = "/drinks/{id}",
    params(("id" = i64, Path, description = "Drink ID")),
    request_body = UpdateDrinkRequest,
    responses(
        (status = 200, description = "Drink updated", body = DetailResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Token lacks patch:drinks", body = crate::error::ErrorBody),
        (status = 404, description = "Drink not found", body = crate::error::ErrorBody),
        (status = 422, description = "Nothing to update or invalid field", body = crate::error::ErrorBody),
    ),
    security(("bearer" = ["patch:drinks"])),
    tag = "drinks"
)]
async fn update_drink(
    State(state): State<AppState>,
    Authorized(caller): Authorized,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DetailResponse>, AppError> {
    let id = drink_id(id)?;
    let current = state.drinks.get(id).ok_or(AppError::NotFound)?;
    let req = extract_validated_json(body)?;

    let changed = Drink {
        id,
        title: req.title.unwrap_or(current.title),
        recipe: req.recipe.unwrap_or(current.recipe),
    };
    let drink = state
        .update_drink(changed)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(id, title = %drink.title, sub = ?caller.subject(), "drink updated");
    Ok(DetailResponse::of([drink]))
}

/// DELETE /drinks/:id: Remove a drink.
#[utoipa::path(
    delete,
    path = "/drinks/{id}",
    params(("id" = i64, Path, description = "Drink ID")),
    responses(
        (status = 200, description = "Drink deleted", body = DeleteResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Token lacks delete:drinks", body = crate::error::ErrorBody),
        (status = 404, description = "Drink not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = ["delete:drinks"])),
    tag = "drinks"
)]
async fn delete_drink(
    State(state): State<AppState>,
    Authorized(caller): Authorized,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = drink_id(id)?;
    state.delete_drink(id).await?.ok_or(AppError::NotFound)?;

    tracing::info!(id, sub = ?caller.subject(), "drink deleted");
    Ok(Json(DeleteResponse {
        success: true,
        delete: id,
    }))
}
