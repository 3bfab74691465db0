//! # coffeeshop-auth: Bearer Token Verification
//!
//! Verifies JWT bearer tokens issued by an external identity provider and
//! enforces per-endpoint permission scopes.
//!
//! ## Components
//!
//! - [`KeyProvider`] fetches the provider's JSON Web Key Set through a
//!   [`KeySource`] and caches it as an immutable [`SigningKeySet`] snapshot.
//!   Snapshots are swapped atomically; readers never block on a refresh.
//! - [`TokenVerifier`] decodes the token header, selects the key by `kid`,
//!   checks signature, expiry, issuer and audience, then the `permissions`
//!   claim against the scope the endpoint requires.
//! - [`bearer_token`] parses an `Authorization: Bearer <token>` header.
//!
//! ## Failure Taxonomy
//!
//! Every failure is an [`AuthError`] carrying a stable code, an HTTP status and
//! a client-safe description. [`AuthError::KeyFetch`] is the only
//! infrastructure failure and reports as a 500 without an authorization code.
//!
//! ## Crate Policy
//!
//! Framework-agnostic: no axum here. The HTTP layer lives in `coffeeshop-api`.

pub mod bearer;
pub mod claims;
pub mod config;
pub mod error;
pub mod jwks;
pub mod provider;
pub mod scope;
pub mod verifier;

pub use bearer::bearer_token;
pub use claims::TokenPayload;
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, HeaderDefect, KeyFetchError};
pub use jwks::{
    HttpKeySource, KeySource, SigningKey, SigningKeySet, StaticKeySource, MAX_KEY_SET_BYTES,
};
pub use provider::{CacheSettings, KeyProvider};
pub use verifier::{check_permissions, TokenVerifier, VerifierConfig};
