//! # coffeeshop-api: Axum API for the Coffee Shop Menu
//!
//! ## API Surface
//!
//! | Route              | Method | Scope               |
//! |--------------------|--------|---------------------|
//! | `/drinks`          | GET    | none                |
//! | `/drinks-detail`   | GET    | `get:drinks-detail` |
//! | `/drinks`          | POST   | `post:drinks`       |
//! | `/drinks/:id`      | PATCH  | `patch:drinks`      |
//! | `/drinks/:id`      | DELETE | `delete:drinks`     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → CorsLayer → require_scope (per handler) → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Auto-generated OpenAPI 3.1 spec via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health checks (`/health/*`) carry no authorization.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::drinks::router(Arc::clone(&state.verifier)))
        .merge(openapi::router())
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Liveness check: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
