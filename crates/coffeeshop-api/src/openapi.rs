//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented drinks routes into a single OpenAPI 3.1
//! spec, served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coffee Shop API",
        version = "0.1.0",
        description = "Drinks menu with per-endpoint permission scopes carried in bearer tokens."
    ),
    paths(
        crate::routes::drinks::list_drinks,
        crate::routes::drinks::get_drinks_detail,
        crate::routes::drinks::create_drink,
        crate::routes::drinks::update_drink,
        crate::routes::drinks::delete_drink,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::routes::drinks::CreateDrinkRequest,
        crate::routes::drinks::UpdateDrinkRequest,
        crate::routes::drinks::MenuResponse,
        crate::routes::drinks::DetailResponse,
        crate::routes::drinks::DeleteResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "drinks", description = "Menu management"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` JWT scheme the drinks paths refer to.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
