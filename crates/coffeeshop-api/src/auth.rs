//! # Authorization Middleware
//!
//! Per-handler bearer token check. Each protected handler is wrapped with
//! [`require_scope`] carrying the scope it needs:
//!
//! ```ignore
//! post(create_drink.layer(from_fn_with_state(
//!     ScopeGuard::new(verifier, scope::POST_DRINKS),
//!     require_scope,
//! )))
//! ```
//!
//! On success the verified [`TokenPayload`] is inserted into the request
//! extensions and handlers receive it through the [`Authorized`] extractor.
//! On failure the handler never runs.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use coffeeshop_auth::{bearer_token, AuthError, HeaderDefect, TokenPayload, TokenVerifier};

use crate::error::AppError;

/// Middleware state: the shared verifier and the scope one handler requires.
#[derive(Debug, Clone)]
pub struct ScopeGuard {
    verifier: Arc<TokenVerifier>,
    scope: &'static str,
}

impl ScopeGuard {
    /// Guard requiring `scope`.
    pub fn new(verifier: Arc<TokenVerifier>, scope: &'static str) -> Self {
        Self { verifier, scope }
    }

    /// The required scope.
    pub fn scope(&self) -> &'static str {
        self.scope
    }
}

/// Verify the bearer token against the guard's scope before running the handler.
pub async fn require_scope(
    State(guard): State<ScopeGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = authorization_header(&request);
    let verdict = match header {
        Ok(raw) => authorize(&guard, raw).await,
        Err(err) => Err(err),
    };
    match verdict {
        Ok(payload) => {
            tracing::debug!(scope = guard.scope, sub = ?payload.subject(), "request authorized");
            request.extensions_mut().insert(payload);
            next.run(request).await
        }
        Err(err) => {
            if !err.is_infrastructure() {
                tracing::warn!(
                    scope = guard.scope,
                    code = err.code(),
                    status = err.status().as_u16(),
                    reason = %err,
                    "authorization failed"
                );
            }
            AppError::from(err).into_response()
        }
    }
}

async fn authorize(guard: &ScopeGuard, raw: Option<String>) -> Result<TokenPayload, AuthError> {
    let token = bearer_token(raw.as_deref())?;
    guard.verifier.verify(token, guard.scope).await
}

/// Owned copy of the header; the request is not `Sync` and must not be
/// borrowed across the verifier's await.
fn authorization_header(request: &Request) -> Result<Option<String>, AuthError> {
    match request.headers().get(header::AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|s| Some(s.to_string()))
            .map_err(|_| AuthError::MalformedHeader(HeaderDefect::NotBearer)),
    }
}

/// The verified token payload of an authorized request.
#[derive(Debug, Clone)]
pub struct Authorized(pub TokenPayload);

/// Reads the payload [`require_scope`] injected. Returns 401 when the
/// middleware did not run.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Authorized {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TokenPayload>()
            .cloned()
            .map(Authorized)
            .ok_or(AppError::Auth(AuthError::AuthorizationHeaderMissing))
    }
}
