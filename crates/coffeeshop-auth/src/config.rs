//! Authorization configuration.
//!
//! Read from the environment at startup. `AUTH0_DOMAIN` is enough for a
//! standard tenant: the JWKS URL and the expected issuer derive from it.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

use crate::error::KeyFetchError;
use crate::jwks::HttpKeySource;
use crate::provider::{CacheSettings, KeyProvider};
use crate::verifier::{is_symmetric, TokenVerifier, VerifierConfig};

/// Everything needed to build a [`TokenVerifier`] backed by a remote key set.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Where the provider publishes its key set.
    pub jwks_url: Url,
    /// Verification policy.
    pub verifier: VerifierConfig,
    /// Key cache tuning.
    pub cache: CacheSettings,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwks_url", &redacted(&self.jwks_url))
            .field("verifier", &self.verifier)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Strip any userinfo from a URL before it reaches a log line.
fn redacted(url: &Url) -> String {
    let mut clean = url.clone();
    if clean.password().is_some() {
        let _ = clean.set_password(Some("[REDACTED]"));
    }
    clean.to_string()
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `AUTH0_DOMAIN`: tenant domain, e.g. `dev-xyz.us.auth0.com`
    /// - `JWKS_URL` (default: `https://<AUTH0_DOMAIN>/.well-known/jwks.json`)
    /// - `API_AUDIENCE` (default: audience not checked)
    /// - `AUTH_ISSUER` (default: `https://<AUTH0_DOMAIN>/`, else not checked)
    /// - `JWT_ALGORITHMS` (default: `RS256`)
    /// - `JWT_LEEWAY_SECS` (default: 0)
    /// - `JWKS_CACHE_TTL_SECS` (default: 600)
    /// - `JWKS_MIN_REFRESH_SECS` (default: 30)
    /// - `JWKS_TIMEOUT_SECS` (default: 10, must be positive)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let domain = get("AUTH0_DOMAIN").map(|d| d.trim().trim_end_matches('/').to_string());

        let jwks_raw = match (get("JWKS_URL"), &domain) {
            (Some(url), _) => url,
            (None, Some(domain)) => format!("https://{domain}/.well-known/jwks.json"),
            (None, None) => return Err(ConfigError::MissingKeySetLocation),
        };
        let jwks_url = Url::parse(jwks_raw.trim())
            .map_err(|e| ConfigError::InvalidUrl("JWKS_URL".to_string(), e.to_string()))?;
        require_https(&jwks_url)?;

        let issuer = get("AUTH_ISSUER").or_else(|| domain.as_ref().map(|d| format!("https://{d}/")));

        let algorithms = match get("JWT_ALGORITHMS") {
            Some(list) => parse_algorithms(&list)?,
            None => vec![Algorithm::RS256],
        };

        let defaults = CacheSettings::default();
        let fetch_timeout = number(&get, "JWKS_TIMEOUT_SECS", defaults.fetch_timeout.as_secs())?;
        if fetch_timeout == 0 {
            return Err(ConfigError::ZeroDuration("JWKS_TIMEOUT_SECS".to_string()));
        }

        Ok(Self {
            jwks_url,
            verifier: VerifierConfig {
                algorithms,
                audience: get("API_AUDIENCE"),
                issuer,
                leeway_secs: number(&get, "JWT_LEEWAY_SECS", 0)?,
            },
            cache: CacheSettings {
                ttl: Duration::from_secs(number(&get, "JWKS_CACHE_TTL_SECS", defaults.ttl.as_secs())?),
                min_refresh_interval: Duration::from_secs(number(
                    &get,
                    "JWKS_MIN_REFRESH_SECS",
                    defaults.min_refresh_interval.as_secs(),
                )?),
                fetch_timeout: Duration::from_secs(fetch_timeout),
            },
        })
    }

    /// Build a verifier fetching keys over HTTP.
    pub fn build_verifier(&self) -> Result<TokenVerifier, KeyFetchError> {
        let source = HttpKeySource::new(self.jwks_url.clone(), self.cache.fetch_timeout)?;
        let provider = KeyProvider::new(Arc::new(source), self.cache);
        Ok(TokenVerifier::new(Arc::new(provider), self.verifier.clone()))
    }
}

fn number(
    get: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
    }
}

fn parse_algorithms(list: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg = Algorithm::from_str(name)
            .map_err(|_| ConfigError::InvalidAlgorithm(name.to_string()))?;
        if is_symmetric(alg) {
            return Err(ConfigError::SymmetricAlgorithm(name.to_string()));
        }
        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }
    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithm(list.to_string()));
    }
    Ok(algorithms)
}

fn require_https(url: &Url) -> Result<(), ConfigError> {
    if url.scheme() == "https" {
        return Ok(());
    }
    let loopback = match url.host() {
        Some(url::Host::Domain(d)) => d == "localhost",
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    };
    if url.scheme() == "http" && loopback {
        Ok(())
    } else {
        Err(ConfigError::InsecureKeySetUrl(redacted(url)))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("either AUTH0_DOMAIN or JWKS_URL must be set")]
    MissingKeySetLocation,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("key set URL must use https (got {0})")]
    InsecureKeySetUrl(String),
    #[error("unknown signature algorithm {0:?}")]
    InvalidAlgorithm(String),
    #[error("symmetric algorithm {0} cannot be used with a public key set")]
    SymmetricAlgorithm(String),
    #[error("{0} must be a non-negative integer, got {1:?}")]
    InvalidNumber(String, String),
    #[error("{0} must be greater than zero")]
    ZeroDuration(String),
}
