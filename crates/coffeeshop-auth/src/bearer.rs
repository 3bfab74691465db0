//! # Bearer Header Parsing
//!
//! Splits an `Authorization` header value on whitespace and accepts exactly
//! `Bearer <token>`. The scheme match is case-insensitive.

use crate::error::{AuthError, HeaderDefect};

/// Extract the token from an `Authorization` header value.
///
/// `None`, empty and whitespace-only values count as a missing header.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let parts: Vec<&str> = match header {
        Some(value) => value.split_whitespace().collect(),
        None => Vec::new(),
    };

    let Some(scheme) = parts.first() else {
        return Err(AuthError::AuthorizationHeaderMissing);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader(HeaderDefect::NotBearer));
    }

    match parts.as_slice() {
        [_] => Err(AuthError::MalformedHeader(HeaderDefect::TokenMissing)),
        [_, token] => Ok(token),
        _ => Err(AuthError::MalformedHeader(HeaderDefect::ExtraParts)),
    }
}
