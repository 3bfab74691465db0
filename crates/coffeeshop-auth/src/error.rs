//! # Authorization Errors
//!
//! Each variant is raised at exactly one detection point and carried
//! unchanged to the HTTP boundary. The `Display` output is for operator logs
//! and may contain detail; [`AuthError::description`] is what clients see.

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// Why an `Authorization` header or token header could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDefect {
    /// Scheme is something other than `Bearer`.
    NotBearer,
    /// `Bearer` with nothing after it.
    TokenMissing,
    /// More than two whitespace-separated parts.
    ExtraParts,
    /// The token's header segment is not valid base64url JSON with a known `alg`.
    Undecodable,
    /// The token header carries no `kid`.
    KeyIdMissing,
}

impl HeaderDefect {
    /// Client-facing message for this defect.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotBearer => "Authorization header must start with \"Bearer\".",
            Self::TokenMissing => "Token not found.",
            Self::ExtraParts => "Authorization header must be bearer token.",
            Self::Undecodable => "Unable to decode authentication token header.",
            Self::KeyIdMissing => "Authorization malformed.",
        }
    }
}

impl std::fmt::Display for HeaderDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotBearer => "scheme is not Bearer",
            Self::TokenMissing => "no token after scheme",
            Self::ExtraParts => "more than two parts",
            Self::Undecodable => "token header undecodable",
            Self::KeyIdMissing => "token header has no kid",
        };
        f.write_str(s)
    }
}

/// Failure to obtain the identity provider's signing keys.
#[derive(Error, Debug)]
pub enum KeyFetchError {
    /// The request could not be sent or the body could not be read.
    #[error("key set request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-2xx status.
    #[error("key set endpoint {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The document is not a usable key set.
    #[error("malformed key set: {0}")]
    Malformed(String),

    /// The fetch did not complete in time.
    #[error("key set fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// A classified authorization failure.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No `Authorization` header, or an empty token.
    #[error("authorization header missing")]
    AuthorizationHeaderMissing,

    /// The header or the token header is unusable.
    #[error("malformed header: {0}")]
    MalformedHeader(HeaderDefect),

    /// No key in the current set matches the token's `kid`.
    #[error("no signing key for kid {kid:?}")]
    KeySelectionFailure { kid: String },

    /// `exp` is in the past.
    #[error("token expired")]
    TokenExpired,

    /// Issuer, audience or not-before check failed.
    #[error("claims mismatch: {0}")]
    ClaimsMismatch(String),

    /// Signature, algorithm or structure could not be verified.
    #[error("unparseable token: {0}")]
    TokenUnparseable(String),

    /// The verified payload has no `permissions` claim.
    #[error("permissions claim missing")]
    PermissionsClaimMissing,

    /// The `permissions` claim does not grant the required scope.
    #[error("permission {required:?} not granted")]
    PermissionDenied { required: String },

    /// Signing keys could not be fetched. Infrastructure, not the client's fault.
    #[error("signing keys unavailable: {0}")]
    KeyFetch(#[from] KeyFetchError),
}

impl AuthError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthorizationHeaderMissing => "authorization_header_missing",
            Self::MalformedHeader(_) | Self::KeySelectionFailure { .. } => "invalid_header",
            Self::TokenUnparseable(_) => "invalid_header",
            Self::TokenExpired => "token_expired",
            Self::ClaimsMismatch(_) | Self::PermissionsClaimMissing => "invalid_claims",
            Self::PermissionDenied { .. } => "unauthorized",
            Self::KeyFetch(_) => "internal_server_error",
        }
    }

    /// HTTP status for the response.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthorizationHeaderMissing
            | Self::MalformedHeader(_)
            | Self::KeySelectionFailure { .. }
            | Self::TokenExpired
            | Self::ClaimsMismatch(_) => StatusCode::UNAUTHORIZED,
            Self::TokenUnparseable(_) | Self::PermissionsClaimMissing => StatusCode::BAD_REQUEST,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::KeyFetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Never contains token contents or internal detail.
    pub fn description(&self) -> &'static str {
        match self {
            Self::AuthorizationHeaderMissing => "Authorization header is expected.",
            Self::MalformedHeader(defect) => defect.description(),
            Self::KeySelectionFailure { .. } => "Unable to find the appropriate key.",
            Self::TokenExpired => "Token expired.",
            Self::ClaimsMismatch(_) => "Incorrect claims. Please, check the audience and issuer.",
            Self::TokenUnparseable(_) => "Unable to parse authentication token.",
            Self::PermissionsClaimMissing => "Permissions not included in JWT.",
            Self::PermissionDenied { .. } => "Permission not found.",
            Self::KeyFetch(_) => "Internal server error.",
        }
    }

    /// Whether the failure is on our side rather than the caller's.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::KeyFetch(_))
    }
}
