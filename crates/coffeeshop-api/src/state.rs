//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! The in-memory [`DrinkStore`] answers every read. When a database pool is
//! configured, writes go to PostgreSQL first and reach the in-memory store
//! only once the database has accepted them, so the two never disagree
//! after a failed write.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use coffeeshop_auth::{AuthConfig, ConfigError, TokenVerifier};
use coffeeshop_core::{Drink, DrinkTitle, Ingredient, Recipe};
use parking_lot::RwLock;
use sqlx::PgPool;
use thiserror::Error;

// -- Drink Store --------------------------------------------------------------

/// Infrastructure failures: the database rejected or failed an operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Why a drink could not be written.
///
/// `DuplicateTitle` and `Invalid` are the caller's fault. `Store` is ours.
#[derive(Error, Debug)]
pub enum DrinkError {
    /// Titles are unique across the menu.
    #[error("a drink titled {0:?} already exists")]
    DuplicateTitle(String),

    /// The drink itself is not valid.
    #[error(transparent)]
    Invalid(#[from] coffeeshop_core::ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Thread-safe, cloneable in-memory drink table ordered by id.
///
/// The `parking_lot` lock is never held across `.await`.
#[derive(Debug, Clone)]
pub struct DrinkStore {
    data: Arc<RwLock<BTreeMap<i64, Drink>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for DrinkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DrinkStore {
    /// Create an empty store. Ids start at 1.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// All drinks, ordered by id.
    pub fn list(&self) -> Vec<Drink> {
        self.data.read().values().cloned().collect()
    }

    /// Retrieve a drink by id.
    pub fn get(&self, id: i64) -> Option<Drink> {
        self.data.read().get(&id).cloned()
    }

    /// Whether another drink (not `except`) already uses `title`.
    pub fn title_in_use(&self, title: &DrinkTitle, except: Option<i64>) -> bool {
        title_taken(&self.data.read(), title, except)
    }

    /// Allocate an id and insert, atomically checking title uniqueness.
    pub fn create(&self, title: DrinkTitle, recipe: Recipe) -> Result<Drink, DrinkError> {
        let mut guard = self.data.write();
        if title_taken(&guard, &title, None) {
            return Err(DrinkError::DuplicateTitle(title.to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let drink = Drink { id, title, recipe };
        guard.insert(id, drink.clone());
        Ok(drink)
    }

    /// Insert or overwrite a drink whose id was assigned elsewhere.
    pub fn put(&self, drink: Drink) -> Option<Drink> {
        self.next_id.fetch_max(drink.id + 1, Ordering::SeqCst);
        self.data.write().insert(drink.id, drink)
    }

    /// Replace an existing drink, atomically checking title uniqueness.
    ///
    /// Returns `Ok(None)` if no drink has that id.
    pub fn replace(&self, drink: Drink) -> Result<Option<Drink>, DrinkError> {
        let mut guard = self.data.write();
        if !guard.contains_key(&drink.id) {
            return Ok(None);
        }
        if title_taken(&guard, &drink.title, Some(drink.id)) {
            return Err(DrinkError::DuplicateTitle(drink.title.to_string()));
        }
        guard.insert(drink.id, drink.clone());
        Ok(Some(drink))
    }

    /// Remove a drink by id.
    pub fn remove(&self, id: i64) -> Option<Drink> {
        self.data.write().remove(&id)
    }

    /// Number of drinks.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn title_taken(map: &BTreeMap<i64, Drink>, title: &DrinkTitle, except: Option<i64>) -> bool {
    map.values()
        .any(|d| d.title == *title && Some(d.id) != except)
}

// -- Configuration ------------------------------------------------------------

/// Startup configuration errors.
#[derive(Error, Debug)]
pub enum AppConfigError {
    #[error(transparent)]
    Auth(#[from] ConfigError),
    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Insert the sample "water" drink when the menu starts empty.
    pub seed_sample_drinks: bool,
    /// Token verification settings.
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 5000)
    /// - `SEED_SAMPLE_DRINKS` (default: false)
    /// - everything [`AuthConfig::from_env`] reads
    pub fn from_env() -> Result<Self, AppConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppConfigError::InvalidPort(raw))?,
            Err(_) => 5000,
        };
        let seed_sample_drinks = std::env::var("SEED_SAMPLE_DRINKS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            port,
            seed_sample_drinks,
            auth: AuthConfig::from_env()?,
        })
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Authoritative copy for reads.
    pub drinks: DrinkStore,

    /// PostgreSQL pool. When `None`, the API runs in-memory only.
    pub db_pool: Option<PgPool>,

    /// Bearer token verifier shared by every protected route.
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// In-memory state.
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self {
            drinks: DrinkStore::new(),
            db_pool: None,
            verifier,
        }
    }

    /// State backed by an optional database pool.
    pub fn with_pool(verifier: Arc<TokenVerifier>, db_pool: Option<PgPool>) -> Self {
        Self {
            db_pool,
            ..Self::new(verifier)
        }
    }

    /// Load every persisted drink into the in-memory store.
    pub async fn hydrate_from_db(&self) -> Result<(), StoreError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };

        let drinks = crate::db::drinks::load_all(pool).await?;
        let count = drinks.len();
        for drink in drinks {
            self.drinks.put(drink);
        }

        tracing::info!(drinks = count, "Hydrated in-memory store from database");
        Ok(())
    }

    /// Add a drink, persisting it first when a database is configured.
    pub async fn create_drink(&self, title: DrinkTitle, recipe: Recipe) -> Result<Drink, DrinkError> {
        let Some(pool) = &self.db_pool else {
            return self.drinks.create(title, recipe);
        };

        if self.drinks.title_in_use(&title, None) {
            return Err(DrinkError::DuplicateTitle(title.to_string()));
        }
        let id = crate::db::drinks::insert(pool, &title, &recipe).await?;
        let drink = Drink { id, title, recipe };
        self.drinks.put(drink.clone());
        Ok(drink)
    }

    /// Overwrite an existing drink. `Ok(None)` if the id is unknown.
    pub async fn update_drink(&self, drink: Drink) -> Result<Option<Drink>, DrinkError> {
        if let Some(pool) = &self.db_pool {
            if self.drinks.title_in_use(&drink.title, Some(drink.id)) {
                return Err(DrinkError::DuplicateTitle(drink.title.to_string()));
            }
            if !crate::db::drinks::update(pool, &drink).await? {
                return Ok(None);
            }
        }
        self.drinks.replace(drink)
    }

    /// Remove a drink. `Ok(None)` if the id is unknown.
    pub async fn delete_drink(&self, id: i64) -> Result<Option<Drink>, StoreError> {
        if self.drinks.get(id).is_none() {
            return Ok(None);
        }
        if let Some(pool) = &self.db_pool {
            crate::db::drinks::delete(pool, id).await?;
        }
        Ok(self.drinks.remove(id))
    }

    /// Put the sample "water" drink on an empty menu.
    pub async fn seed_sample_drinks(&self) -> Result<(), DrinkError> {
        if !self.drinks.is_empty() {
            return Ok(());
        }
        let title = DrinkTitle::new("water")?;
        let recipe = Recipe::new(vec![Ingredient {
            name: "water".to_string(),
            color: "blue".to_string(),
            parts: 1,
        }])?;

        let drink = self.create_drink(title, recipe).await?;
        tracing::info!(id = drink.id, title = %drink.title, "Seeded sample drink");
        Ok(())
    }
}
