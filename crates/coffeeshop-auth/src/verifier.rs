//! # Token Verifier
//!
//! Turns a raw bearer token and a required scope into a verified
//! [`TokenPayload`] or a classified [`AuthError`]. Each step short-circuits:
//!
//! 1. presence
//! 2. header decode (untrusted; only `alg` and `kid` are read)
//! 3. key selection by `kid`
//! 4. signature, algorithm and claim checks
//! 5. scope membership in `permissions`

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::Value;

use crate::claims::TokenPayload;
use crate::error::{AuthError, HeaderDefect};
use crate::provider::KeyProvider;

/// Verification policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Accepted signature algorithms. Symmetric algorithms are never honoured.
    pub algorithms: Vec<Algorithm>,
    /// Expected `aud`. `None` skips the audience check.
    pub audience: Option<String>,
    /// Expected `iss`. `None` skips the issuer check.
    pub issuer: Option<String>,
    /// Clock skew allowance for `exp` and `nbf`, in seconds.
    pub leeway_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            algorithms: vec![Algorithm::RS256],
            audience: None,
            issuer: None,
            leeway_secs: 0,
        }
    }
}

pub(crate) fn is_symmetric(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Verifies bearer tokens against the provider's current signing keys.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    keys: Arc<KeyProvider>,
    config: VerifierConfig,
}

impl TokenVerifier {
    /// Create a verifier reading keys from `keys`.
    pub fn new(keys: Arc<KeyProvider>, config: VerifierConfig) -> Self {
        Self { keys, config }
    }

    /// The key provider in use.
    pub fn key_provider(&self) -> &Arc<KeyProvider> {
        &self.keys
    }

    /// The verification policy.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify `raw` and require `scope` in its `permissions` claim.
    ///
    /// The payload is returned exactly as issued.
    pub async fn verify(&self, raw: &str, scope: &str) -> Result<TokenPayload, AuthError> {
        let payload = self.authenticate(raw).await?;
        check_permissions(&payload, scope)?;
        Ok(payload)
    }

    /// Verify signature and claims without a scope check.
    pub async fn authenticate(&self, raw: &str) -> Result<TokenPayload, AuthError> {
        if raw.trim().is_empty() {
            return Err(AuthError::AuthorizationHeaderMissing);
        }

        let header = decode_header(raw)
            .map_err(|_| AuthError::MalformedHeader(HeaderDefect::Undecodable))?;
        let kid = header
            .kid
            .ok_or(AuthError::MalformedHeader(HeaderDefect::KeyIdMissing))?;

        let key = self
            .keys
            .key_for(&kid)
            .await?
            .ok_or_else(|| AuthError::KeySelectionFailure { kid: kid.clone() })?;

        let alg = header.alg;
        if is_symmetric(alg) || !self.config.algorithms.contains(&alg) {
            return Err(AuthError::TokenUnparseable(format!(
                "algorithm {alg:?} not accepted"
            )));
        }
        if let Some(pinned) = key.algorithm() {
            if pinned != alg {
                return Err(AuthError::TokenUnparseable(format!(
                    "key {kid} is pinned to {pinned:?}, token uses {alg:?}"
                )));
            }
        }

        let validation = self.validation(alg);
        let data = decode::<TokenPayload>(raw, key.decoding_key(), &validation)
            .map_err(|e| classify(e.kind()))?;
        Ok(data.claims)
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = self.config.leeway_secs;
        validation.validate_nbf = true;
        // A configured claim must also be present, not merely match when sent.
        match &self.config.audience {
            Some(aud) => {
                validation.set_audience(&[aud]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            None => validation.validate_aud = false,
        }
        if let Some(iss) = &self.config.issuer {
            validation.set_issuer(&[iss]);
            validation.required_spec_claims.insert("iss".to_string());
        }
        validation
    }
}

fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidAudience => AuthError::ClaimsMismatch("audience".into()),
        ErrorKind::InvalidIssuer => AuthError::ClaimsMismatch("issuer".into()),
        ErrorKind::InvalidSubject => AuthError::ClaimsMismatch("subject".into()),
        ErrorKind::ImmatureSignature => AuthError::ClaimsMismatch("not yet valid".into()),
        ErrorKind::MissingRequiredClaim(claim) if claim == "aud" || claim == "iss" => {
            AuthError::ClaimsMismatch(format!("{claim} missing"))
        }
        other => AuthError::TokenUnparseable(format!("{other:?}")),
    }
}

/// Require `scope` in the payload's `permissions` claim.
///
/// A claim that is present but not an array grants nothing.
pub fn check_permissions(payload: &TokenPayload, scope: &str) -> Result<(), AuthError> {
    match payload.permissions() {
        None => Err(AuthError::PermissionsClaimMissing),
        Some(Value::Array(_)) if payload.grants(scope) => Ok(()),
        Some(_) => Err(AuthError::PermissionDenied {
            required: scope.to_string(),
        }),
    }
}
