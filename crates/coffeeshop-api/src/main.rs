//! # coffeeshop-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the drinks menu.
//! Binds to configurable port (default 5000).

use std::sync::Arc;

use coffeeshop_api::state::{AppConfig, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {e}");
        e
    })?;
    tracing::info!(auth = ?config.auth, "Configuration loaded");

    let verifier = config.auth.build_verifier().map_err(|e| {
        tracing::error!("Token verifier initialization failed: {e}");
        e
    })?;

    // Initialize database pool (optional: absent means in-memory only).
    let db_pool = coffeeshop_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = AppState::with_pool(Arc::new(verifier), db_pool);

    // Hydrate the in-memory store from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    if config.seed_sample_drinks {
        state.seed_sample_drinks().await?;
    }

    let app = coffeeshop_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Coffee shop API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
