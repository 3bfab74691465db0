//! Shared fixtures for the authorization integration tests.
//!
//! Tokens are minted with the RSA keys under `tests/fixtures/`. The public
//! half of `primary.pem` is published in `jwks.json` as `test-key-1`; the
//! public half of `rogue.pem` is published in `jwks_rotated.json` as
//! `test-key-2`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use coffeeshop_auth::{
    CacheSettings, KeyFetchError, KeyProvider, KeySource, SigningKeySet, TokenVerifier,
    VerifierConfig,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

pub const PRIMARY_PEM: &str = include_str!("../fixtures/primary.pem");
pub const ROGUE_PEM: &str = include_str!("../fixtures/rogue.pem");
pub const JWKS: &str = include_str!("../fixtures/jwks.json");
pub const JWKS_ROTATED: &str = include_str!("../fixtures/jwks_rotated.json");

pub const KID: &str = "test-key-1";
pub const ROTATED_KID: &str = "test-key-2";
pub const AUDIENCE: &str = "https://coffeeshop.com";
pub const ISSUER: &str = "https://tenant.example.com/";

pub fn primary_keys() -> SigningKeySet {
    SigningKeySet::from_json(JWKS.as_bytes()).unwrap()
}

pub fn rotated_keys() -> SigningKeySet {
    SigningKeySet::from_json(JWKS_ROTATED.as_bytes()).unwrap()
}

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// A claim set valid for an hour, granting `permissions`.
pub fn claims(permissions: &[&str]) -> Map<String, Value> {
    let value = json!({
        "sub": "auth0|barista",
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": now(),
        "exp": now() + 3600,
        "permissions": permissions,
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub fn mint_with(pem: &str, kid: &str, claims: &Map<String, Value>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Token signed by the primary key under `test-key-1`.
pub fn mint(claims: &Map<String, Value>) -> String {
    mint_with(PRIMARY_PEM, KID, claims)
}

pub fn strict_config() -> VerifierConfig {
    VerifierConfig {
        audience: Some(AUDIENCE.to_string()),
        issuer: Some(ISSUER.to_string()),
        ..VerifierConfig::default()
    }
}

pub fn verifier_with(source: Arc<dyn KeySource>, config: VerifierConfig) -> TokenVerifier {
    let provider = KeyProvider::new(source, CacheSettings::default());
    TokenVerifier::new(Arc::new(provider), config)
}

// ── Instrumented key sources ─────────────────────────────────────────

/// Serves a fixed set and counts fetches. An optional delay widens races.
#[derive(Debug)]
pub struct CountingSource {
    keys: SigningKeySet,
    delay: Duration,
    pub fetches: AtomicUsize,
}

impl CountingSource {
    pub fn new(keys: SigningKeySet) -> Self {
        Self::with_delay(keys, Duration::ZERO)
    }

    pub fn with_delay(keys: SigningKeySet, delay: Duration) -> Self {
        Self {
            keys,
            delay,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for CountingSource {
    async fn fetch(&self) -> Result<SigningKeySet, KeyFetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.keys.clone())
    }
}

/// Serves whichever set was most recently installed.
#[derive(Debug)]
pub struct RotatingSource {
    current: Mutex<SigningKeySet>,
    pub fetches: AtomicUsize,
}

impl RotatingSource {
    pub fn new(keys: SigningKeySet) -> Self {
        Self {
            current: Mutex::new(keys),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn rotate(&self, keys: SigningKeySet) {
        *self.current.lock() = keys;
    }

    pub fn count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for RotatingSource {
    async fn fetch(&self) -> Result<SigningKeySet, KeyFetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.lock().clone())
    }
}

/// Always fails.
#[derive(Debug)]
pub struct FailingSource;

#[async_trait]
impl KeySource for FailingSource {
    async fn fetch(&self) -> Result<SigningKeySet, KeyFetchError> {
        Err(KeyFetchError::Status {
            url: "https://tenant.example.com/.well-known/jwks.json".into(),
            status: 503,
        })
    }
}
