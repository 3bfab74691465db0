//! # API Error Types
//!
//! The single HTTP error boundary. Every failure leaves the API as the same
//! envelope:
//!
//! ```json
//! {"success": false, "error": <code or status>, "message": "..."}
//! ```
//!
//! Authorization failures carry their stable string code and client-safe
//! description. Infrastructure failures (key fetch, database) are logged with
//! full detail and answered with a generic 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coffeeshop_auth::AuthError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::{DrinkError, StoreError};

/// The `error` field: a string code for classified failures, the numeric
/// status for plain client errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    /// Numeric HTTP status, e.g. `422`.
    Status(u16),
    /// Stable machine-readable code, e.g. `"token_expired"`.
    Code(String),
}

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Code or status.
    #[schema(value_type = Object)]
    pub error: ErrorCode,
    /// Human-readable, client-safe message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown drink or route (404).
    #[error("resource not found")]
    NotFound,

    /// Well-formed request that fails validation (422).
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authorization failure, reported with its own status and code.
    #[error("authorization failed: {0}")]
    Auth(AuthError),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorCode::Code("resource_not_found".into()),
            ),
            Self::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::Status(422)),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, ErrorCode::Status(400)),
            Self::Auth(err) => (err.status(), ErrorCode::Code(err.code().into())),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::Code("internal_server_error".into()),
            ),
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::NotFound => "Resource not found.".into(),
            Self::Unprocessable(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Auth(err) => err.description().into(),
            Self::Internal(_) => "Internal server error.".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();

        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "internal server error");
        }

        let body = ErrorBody {
            success: false,
            error,
            message: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Key fetch failures are ours, not the caller's: they become a plain 500.
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        if err.is_infrastructure() {
            Self::Internal(err.to_string())
        } else {
            Self::Auth(err)
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<DrinkError> for AppError {
    fn from(err: DrinkError) -> Self {
        match err {
            DrinkError::DuplicateTitle(_) | DrinkError::Invalid(_) => {
                Self::Unprocessable(err.to_string())
            }
            DrinkError::Store(e) => e.into(),
        }
    }
}

impl From<coffeeshop_core::ValidationError> for AppError {
    fn from(err: coffeeshop_core::ValidationError) -> Self {
        Self::Unprocessable(err.to_string())
    }
}
