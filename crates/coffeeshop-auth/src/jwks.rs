//! # JSON Web Key Sets
//!
//! Parsing of the identity provider's published key set into
//! [`SigningKeySet`], and the [`KeySource`] seam the [`crate::KeyProvider`]
//! fetches through.
//!
//! Records that cannot verify a signature are skipped rather than failing
//! the whole document: symmetric keys, keys marked `use: enc`, keys without a
//! `kid`, and key types this crate does not understand. A document with no
//! usable record at all is malformed.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::KeyFetchError;

/// A public key usable for signature verification.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Option<Algorithm>,
    key: DecodingKey,
}

impl SigningKey {
    /// Convert a JWK record. Returns the reason when the record is unusable.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, String> {
        let kid = jwk
            .common
            .key_id
            .clone()
            .ok_or_else(|| "record has no kid".to_string())?;

        if let AlgorithmParameters::OctetKey(_) = jwk.algorithm {
            return Err(format!("{kid}: symmetric keys are not accepted"));
        }
        if let Some(PublicKeyUse::Encryption) = jwk.common.public_key_use {
            return Err(format!("{kid}: encryption key"));
        }

        let algorithm = match &jwk.common.key_algorithm {
            None => None,
            Some(alg) => Some(
                signature_algorithm(alg)
                    .ok_or_else(|| format!("{kid}: {alg:?} is not a signature algorithm"))?,
            ),
        };

        let key = DecodingKey::from_jwk(jwk).map_err(|e| format!("{kid}: {e}"))?;
        Ok(Self {
            kid,
            algorithm,
            key,
        })
    }

    /// Key identifier.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithm the record is pinned to, if it names one.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// Verification key material.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

fn signature_algorithm(alg: &KeyAlgorithm) -> Option<Algorithm> {
    match alg {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}

/// An immutable set of signing keys indexed by `kid`.
#[derive(Debug, Clone, Default)]
pub struct SigningKeySet {
    keys: HashMap<String, SigningKey>,
}

#[derive(Deserialize)]
struct RawKeySet {
    keys: Vec<Value>,
}

impl SigningKeySet {
    /// Parse a JWKS document.
    pub fn from_json(body: &[u8]) -> Result<Self, KeyFetchError> {
        let raw: RawKeySet = serde_json::from_slice(body)
            .map_err(|e| KeyFetchError::Malformed(format!("not a key set document: {e}")))?;

        let mut keys = HashMap::new();
        for (index, record) in raw.keys.into_iter().enumerate() {
            let parsed = serde_json::from_value::<Jwk>(record)
                .map_err(|e| e.to_string())
                .and_then(|jwk| SigningKey::from_jwk(&jwk));
            match parsed {
                Ok(key) => {
                    keys.insert(key.kid.clone(), key);
                }
                Err(reason) => {
                    tracing::warn!(index, %reason, "skipping unusable key set record");
                }
            }
        }

        if keys.is_empty() {
            return Err(KeyFetchError::Malformed(
                "key set contains no usable signing keys".into(),
            ));
        }
        Ok(Self { keys })
    }

    /// Build from already-converted keys. Later duplicates of a `kid` win.
    pub fn from_keys(keys: impl IntoIterator<Item = SigningKey>) -> Self {
        Self {
            keys: keys.into_iter().map(|k| (k.kid.clone(), k)).collect(),
        }
    }

    /// Look up a key by `kid`.
    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key identifiers, sorted.
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

// ── Sources ──────────────────────────────────────────────────────────

/// Largest key set document accepted from the network.
pub const MAX_KEY_SET_BYTES: usize = 256 * 1024;

/// Where signing keys come from.
#[async_trait]
pub trait KeySource: Send + Sync + std::fmt::Debug {
    /// Retrieve the current key set.
    async fn fetch(&self) -> Result<SigningKeySet, KeyFetchError>;
}

/// Fetches the key set over HTTPS from the provider's JWKS endpoint.
#[derive(Debug, Clone)]
pub struct HttpKeySource {
    url: Url,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpKeySource {
    /// Create a source with the given request timeout.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, KeyFetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| KeyFetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        Ok(Self { url, timeout, http })
    }

    /// The JWKS endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<SigningKeySet, KeyFetchError> {
        let url = self.url.to_string();
        let classify = |source: reqwest::Error, url: &str| {
            if source.is_timeout() {
                KeyFetchError::Timeout(self.timeout)
            } else {
                KeyFetchError::Transport {
                    url: url.to_string(),
                    source,
                }
            }
        };

        let mut resp = self
            .http
            .get(self.url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| classify(e, &url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(KeyFetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        if resp
            .content_length()
            .is_some_and(|len| len > MAX_KEY_SET_BYTES as u64)
        {
            return Err(oversized());
        }
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| classify(e, &url))? {
            if body.len() + chunk.len() > MAX_KEY_SET_BYTES {
                return Err(oversized());
            }
            body.extend_from_slice(&chunk);
        }
        SigningKeySet::from_json(&body)
    }
}

fn oversized() -> KeyFetchError {
    KeyFetchError::Malformed(format!(
        "key set document exceeds {MAX_KEY_SET_BYTES} bytes"
    ))
}

/// A fixed key set. For tests and for deployments that pin keys locally.
#[derive(Debug, Clone)]
pub struct StaticKeySource(SigningKeySet);

impl StaticKeySource {
    /// Wrap a key set.
    pub fn new(keys: SigningKeySet) -> Self {
        Self(keys)
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<SigningKeySet, KeyFetchError> {
        Ok(self.0.clone())
    }
}
