//! # Integration Tests for coffeeshop-api
//!
//! Drives the full router with `oneshot`: health checks, OpenAPI, the drinks
//! CRUD surface under each scope, every bearer header failure, and the 500
//! envelope when the key set cannot be fetched.
//!
//! Tokens are signed with `tests/fixtures/primary.pem`, whose public half is
//! published in `tests/fixtures/jwks.json` as `test-key-1`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use coffeeshop_api::state::AppState;
use coffeeshop_auth::{
    CacheSettings, KeyFetchError, KeyProvider, KeySource, SigningKeySet, StaticKeySource,
    TokenVerifier, VerifierConfig,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

const PRIMARY_PEM: &str = include_str!("fixtures/primary.pem");
const JWKS: &str = include_str!("fixtures/jwks.json");
const KID: &str = "test-key-1";

const ALL_SCOPES: [&str; 4] = [
    "get:drinks-detail",
    "post:drinks",
    "patch:drinks",
    "delete:drinks",
];

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn mint(claims: Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    let key = EncodingKey::from_rsa_pem(PRIMARY_PEM.as_bytes()).unwrap();
    encode(&header, &claims, &key).unwrap()
}

/// Token valid for an hour granting `permissions`.
fn token(permissions: &[&str]) -> String {
    mint(json!({
        "sub": "auth0|manager",
        "iat": now(),
        "exp": now() + 3600,
        "permissions": permissions,
    }))
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn app_with_source(source: Arc<dyn KeySource>) -> Router {
    let provider = KeyProvider::new(source, CacheSettings::default());
    let verifier = TokenVerifier::new(Arc::new(provider), VerifierConfig::default());
    coffeeshop_api::app(AppState::new(Arc::new(verifier)))
}

/// Helper: build the test app with the fixture key set and an empty menu.
fn test_app() -> Router {
    let keys = SigningKeySet::from_json(JWKS.as_bytes()).unwrap();
    app_with_source(Arc::new(StaticKeySource::new(keys)))
}

#[derive(Debug)]
struct UnreachableKeys;

#[async_trait]
impl KeySource for UnreachableKeys {
    async fn fetch(&self) -> Result<SigningKeySet, KeyFetchError> {
        Err(KeyFetchError::Status {
            url: "https://tenant.example.com/.well-known/jwks.json".into(),
            status: 502,
        })
    }
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

fn latte() -> Value {
    json!({
        "title": "latte",
        "recipe": [
            {"name": "espresso", "color": "brown", "parts": 1},
            {"name": "milk", "color": "white", "parts": 3}
        ]
    })
}

async fn create_latte(app: &Router) -> i64 {
    let auth = bearer(&token(&ALL_SCOPES));
    let (status, body) = send(app, Method::POST, "/drinks", Some(auth.as_str()), Some(latte())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["drinks"][0]["id"].as_i64().unwrap()
}

fn assert_failure(body: &Value, code: Value, message: &str) {
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], code);
    assert_eq!(body["message"], message);
}

// -- Health Checks & OpenAPI --------------------------------------------------

#[tokio::test]
async fn test_liveness_endpoint() {
    let (status, body) = send(&test_app(), Method::GET, "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_readiness_endpoint() {
    let (status, body) = send(&test_app(), Method::GET, "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ready");
}

#[tokio::test]
async fn test_openapi_spec_served() {
    let (status, body) = send(&test_app(), Method::GET, "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/drinks"].is_object());
    assert!(body["paths"]["/drinks/{id}"]["patch"].is_object());
}

#[tokio::test]
async fn test_unknown_route_is_not_found_envelope() {
    let (status, body) = send(&test_app(), Method::GET, "/coffee", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_failure(&body, json!("resource_not_found"), "Resource not found.");
}

// -- Drinks CRUD --------------------------------------------------------------

#[tokio::test]
async fn test_public_menu_needs_no_token_and_shows_short_view() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/drinks", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "drinks": []}));

    let id = create_latte(&app).await;
    let (_, body) = send(&app, Method::GET, "/drinks", None, None).await;
    assert_eq!(
        body["drinks"],
        json!([{
            "id": id,
            "title": "latte",
            "recipe": [{"color": "brown", "parts": 1}, {"color": "white", "parts": 3}]
        }])
    );
}

#[tokio::test]
async fn test_detail_shows_long_view() {
    let app = test_app();
    create_latte(&app).await;

    let auth = bearer(&token(&["get:drinks-detail"]));
    let (status, body) = send(&app, Method::GET, "/drinks-detail", Some(auth.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"][0]["recipe"][1]["name"], "milk");
}

#[tokio::test]
async fn test_create_returns_long_view() {
    let app = test_app();
    let auth = bearer(&token(&["post:drinks"]));
    let (status, body) = send(&app, Method::POST, "/drinks", Some(auth.as_str()), Some(latte())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"][0]["title"], "latte");
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "espresso");
}

#[tokio::test]
async fn test_create_accepts_single_ingredient_object() {
    let app = test_app();
    let auth = bearer(&token(&["post:drinks"]));
    let water = json!({"title": "water", "recipe": {"name": "water", "color": "blue", "parts": 1}});
    let (status, body) = send(&app, Method::POST, "/drinks", Some(auth.as_str()), Some(water)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["drinks"][0]["recipe"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_rejects_invalid_drinks() {
    let app = test_app();
    let auth = bearer(&token(&["post:drinks"]));

    for invalid in [
        json!({"title": "", "recipe": [{"name": "water", "color": "blue", "parts": 1}]}),
        json!({"title": "empty", "recipe": []}),
        json!({"title": "zero", "recipe": [{"name": "water", "color": "blue", "parts": 0}]}),
        json!({"recipe": [{"name": "water", "color": "blue", "parts": 1}]}),
    ] {
        let (status, body) = send(&app, Method::POST, "/drinks", Some(auth.as_str()), Some(invalid)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert_eq!(body["error"], 422);
    }
}

#[tokio::test]
async fn test_create_duplicate_title_is_unprocessable() {
    let app = test_app();
    create_latte(&app).await;
    let auth = bearer(&token(&["post:drinks"]));
    let (status, body) = send(&app, Method::POST, "/drinks", Some(auth.as_str()), Some(latte())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], 422);
}

#[tokio::test]
async fn test_create_malformed_json_is_bad_request() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/drinks")
                .header(header::AUTHORIZATION, bearer(&token(&["post:drinks"])))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], 400);
}

#[tokio::test]
async fn test_patch_updates_title_and_keeps_recipe() {
    let app = test_app();
    let id = create_latte(&app).await;
    let auth = bearer(&token(&["patch:drinks"]));

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/drinks/{id}"),
        Some(auth.as_str()),
        Some(json!({"title": "flat white"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["drinks"][0]["id"], id);
    assert_eq!(body["drinks"][0]["title"], "flat white");
    assert_eq!(body["drinks"][0]["recipe"][1]["name"], "milk");

    let (_, menu) = send(&app, Method::GET, "/drinks", None, None).await;
    assert_eq!(menu["drinks"][0]["title"], "flat white");
}

#[tokio::test]
async fn test_patch_failures() {
    let app = test_app();
    let id = create_latte(&app).await;
    let auth = bearer(&token(&["patch:drinks"]));
    let path = format!("/drinks/{id}");

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/drinks/999",
        Some(auth.as_str()),
        Some(json!({"title": "ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/drinks/latte",
        Some(auth.as_str()),
        Some(json!({"title": "ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::PATCH, &path, Some(auth.as_str()), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "request must update title or recipe");

    let (status, _) = send(
        &app,
        Method::PATCH,
        &path,
        Some(auth.as_str()),
        Some(json!({"recipe": []})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_delete_removes_drink() {
    let app = test_app();
    let id = create_latte(&app).await;
    let auth = bearer(&token(&["delete:drinks"]));
    let path = format!("/drinks/{id}");

    let (status, body) = send(&app, Method::DELETE, &path, Some(auth.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "delete": id}));

    let (status, body) = send(&app, Method::DELETE, &path, Some(auth.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_failure(&body, json!("resource_not_found"), "Resource not found.");

    let (_, menu) = send(&app, Method::GET, "/drinks", None, None).await;
    assert_eq!(menu["drinks"], json!([]));
}

// -- Authorization ------------------------------------------------------------

#[tokio::test]
async fn test_missing_header_is_unauthorized() {
    let (status, body) = send(&test_app(), Method::GET, "/drinks-detail", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_failure(
        &body,
        json!("authorization_header_missing"),
        "Authorization header is expected.",
    );
}

#[tokio::test]
async fn test_malformed_headers_are_invalid_header() {
    let app = test_app();
    let valid = token(&ALL_SCOPES);
    let cases = [
        (format!("Token {valid}"), "Authorization header must start with \"Bearer\"."),
        ("Bearer".to_string(), "Token not found."),
        (format!("Bearer {valid} extra"), "Authorization header must be bearer token."),
    ];
    for (value, message) in cases {
        let (status, body) = send(&app, Method::GET, "/drinks-detail", Some(value.as_str()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{value}");
        assert_failure(&body, json!("invalid_header"), message);
    }
}

#[tokio::test]
async fn test_lowercase_bearer_scheme_accepted() {
    let auth = format!("bearer {}", token(&["get:drinks-detail"]));
    let (status, _) = send(&test_app(), Method::GET, "/drinks-detail", Some(auth.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_kid_is_invalid_header() {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("retired-key".to_string());
    let key = EncodingKey::from_rsa_pem(PRIMARY_PEM.as_bytes()).unwrap();
    let claims = json!({"exp": now() + 3600, "permissions": ["get:drinks-detail"]});
    let forged = encode(&header, &claims, &key).unwrap();

    let auth = bearer(&forged);
    let (status, body) = send(&test_app(), Method::GET, "/drinks-detail", Some(auth.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_failure(
        &body,
        json!("invalid_header"),
        "Unable to find the appropriate key.",
    );
}

#[tokio::test]
async fn test_expired_token() {
    let expired = mint(json!({
        "iat": now() - 7200,
        "exp": now() - 3600,
        "permissions": ["get:drinks-detail"],
    }));
    let auth = bearer(&expired);
    let (status, body) = send(&test_app(), Method::GET, "/drinks-detail", Some(auth.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_failure(&body, json!("token_expired"), "Token expired.");
}

#[tokio::test]
async fn test_garbage_token_is_invalid_header() {
    let (status, body) = send(
        &test_app(),
        Method::GET,
        "/drinks-detail",
        Some("Bearer not.a.jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_header");
}

#[tokio::test]
async fn test_missing_permissions_claim() {
    let auth = bearer(&mint(json!({"exp": now() + 3600})));
    let (status, body) = send(&test_app(), Method::GET, "/drinks-detail", Some(auth.as_str()), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, json!("invalid_claims"), "Permissions not included in JWT.");
}

#[tokio::test]
async fn test_wrong_scope_is_forbidden_and_handler_never_runs() {
    let app = test_app();
    let auth = bearer(&token(&["get:drinks-detail", "patch:drinks"]));

    let (status, body) = send(&app, Method::POST, "/drinks", Some(auth.as_str()), Some(latte())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_failure(&body, json!("unauthorized"), "Permission not found.");

    let (_, menu) = send(&app, Method::GET, "/drinks", None, None).await;
    assert_eq!(menu["drinks"], json!([]));
}

#[tokio::test]
async fn test_scope_match_is_case_sensitive() {
    let auth = bearer(&token(&["POST:DRINKS"]));
    let (status, _) = send(&test_app(), Method::POST, "/drinks", Some(auth.as_str()), Some(latte())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_authorization_runs_before_lookup_and_body() {
    let app = test_app();
    let auth = bearer(&token(&["get:drinks-detail"]));

    let (status, _) = send(&app, Method::DELETE, "/drinks/999", Some(auth.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::PATCH, "/drinks/999", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_key_fetch_failure_is_internal_error() {
    let app = app_with_source(Arc::new(UnreachableKeys));
    let auth = bearer(&token(&ALL_SCOPES));
    let (status, body) = send(&app, Method::GET, "/drinks-detail", Some(auth.as_str()), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_failure(&body, json!("internal_server_error"), "Internal server error.");
}

// -- Seeding ------------------------------------------------------------------

#[tokio::test]
async fn test_seed_sample_drinks_only_on_empty_menu() {
    let keys = SigningKeySet::from_json(JWKS.as_bytes()).unwrap();
    let provider = KeyProvider::new(
        Arc::new(StaticKeySource::new(keys)),
        CacheSettings::default(),
    );
    let verifier = TokenVerifier::new(Arc::new(provider), VerifierConfig::default());
    let state = AppState::new(Arc::new(verifier));

    state.seed_sample_drinks().await.unwrap();
    state.seed_sample_drinks().await.unwrap();

    let app = coffeeshop_api::app(state);
    let (_, body) = send(&app, Method::GET, "/drinks", None, None).await;
    assert_eq!(
        body["drinks"],
        json!([{"id": 1, "title": "water", "recipe": [{"color": "blue", "parts": 1}]}])
    );
}
