//! # Key Provider
//!
//! Caches the identity provider's signing keys as an immutable snapshot
//! behind an [`ArcSwapOption`]. Readers load the current snapshot without
//! locking; a refresh builds a complete new [`SigningKeySet`] and swaps it in,
//! so a reader sees either the old set or the new one, never a mix.
//!
//! Refreshes are single-flight: concurrent callers that find the cache cold
//! or stale wait on one fetch and reuse its result. A token naming an unknown
//! `kid` forces a refresh, but no more often than
//! [`CacheSettings::min_refresh_interval`], so a stream of forged `kid`s
//! cannot hammer the provider.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;

use crate::error::KeyFetchError;
use crate::jwks::{KeySource, SigningKey, SigningKeySet};

/// Cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// How long a fetched key set is served before it is refetched.
    pub ttl: Duration,
    /// Minimum age of a snapshot before an unknown `kid` may trigger a refetch.
    pub min_refresh_interval: Duration,
    /// Upper bound on a single fetch.
    pub fetch_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            min_refresh_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct Snapshot {
    keys: Arc<SigningKeySet>,
    fetched_at: Instant,
}

/// Shared, cached access to the current signing keys.
#[derive(Debug)]
pub struct KeyProvider {
    source: Arc<dyn KeySource>,
    snapshot: ArcSwapOption<Snapshot>,
    refresh_lock: tokio::sync::Mutex<()>,
    settings: CacheSettings,
}

impl KeyProvider {
    /// Create a provider with an empty cache. Nothing is fetched until first use.
    pub fn new(source: Arc<dyn KeySource>, settings: CacheSettings) -> Self {
        Self {
            source,
            snapshot: ArcSwapOption::const_empty(),
            refresh_lock: tokio::sync::Mutex::new(()),
            settings,
        }
    }

    /// Cache settings in effect.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// The current key set, fetching it if the cache is empty or past its TTL.
    pub async fn signing_keys(&self) -> Result<Arc<SigningKeySet>, KeyFetchError> {
        if let Some(snap) = self.snapshot.load_full() {
            if snap.fetched_at.elapsed() < self.settings.ttl {
                return Ok(Arc::clone(&snap.keys));
            }
        }
        let ttl = self.settings.ttl;
        self.refresh_if(|current| match current {
            Some(snap) => snap.fetched_at.elapsed() >= ttl,
            None => true,
        })
        .await
    }

    /// Fetch unconditionally and replace the cached set.
    pub async fn refresh(&self) -> Result<Arc<SigningKeySet>, KeyFetchError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store().await
    }

    /// Find the key for `kid`.
    ///
    /// On a miss the set is refetched once, unless the cached snapshot is
    /// younger than the minimum refresh interval. `Ok(None)` means the key is
    /// not published.
    pub async fn key_for(&self, kid: &str) -> Result<Option<SigningKey>, KeyFetchError> {
        let keys = self.signing_keys().await?;
        if let Some(key) = keys.get(kid) {
            return Ok(Some(key.clone()));
        }

        let Some(observed) = self.snapshot.load_full() else {
            return Ok(None);
        };
        if observed.fetched_at.elapsed() < self.settings.min_refresh_interval {
            tracing::debug!(kid, "unknown kid; key set refreshed too recently to refetch");
            return Ok(None);
        }

        let observed_at = observed.fetched_at;
        let min = self.settings.min_refresh_interval;
        let keys = self
            .refresh_if(|current| match current {
                // Someone else refreshed while we waited for the lock.
                Some(snap) if snap.fetched_at > observed_at => false,
                Some(snap) => snap.fetched_at.elapsed() >= min,
                None => true,
            })
            .await?;
        Ok(keys.get(kid).cloned())
    }

    /// The cached set without fetching, if any.
    pub fn current(&self) -> Option<Arc<SigningKeySet>> {
        self.snapshot.load_full().map(|snap| Arc::clone(&snap.keys))
    }

    async fn refresh_if(
        &self,
        stale: impl Fn(Option<&Snapshot>) -> bool,
    ) -> Result<Arc<SigningKeySet>, KeyFetchError> {
        let _guard = self.refresh_lock.lock().await;
        let current = self.snapshot.load_full();
        if !stale(current.as_deref()) {
            if let Some(snap) = current {
                return Ok(Arc::clone(&snap.keys));
            }
        }
        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> Result<Arc<SigningKeySet>, KeyFetchError> {
        let timeout = self.settings.fetch_timeout;
        let fetched = match tokio::time::timeout(timeout, self.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(KeyFetchError::Timeout(timeout)),
        };

        // Failures are reported once, by whoever surfaces the error.
        let keys = Arc::new(fetched?);
        tracing::info!(
            keys = keys.len(),
            kids = ?keys.key_ids(),
            "signing key set refreshed"
        );
        self.snapshot.store(Some(Arc::new(Snapshot {
            keys: Arc::clone(&keys),
            fetched_at: Instant::now(),
        })));
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::StaticKeySource;

    #[tokio::test]
    async fn empty_cache_has_no_current_set() {
        let provider = KeyProvider::new(
            Arc::new(StaticKeySource::new(SigningKeySet::default())),
            CacheSettings::default(),
        );
        assert!(provider.current().is_none());
        provider.signing_keys().await.unwrap();
        assert!(provider.current().is_some());
    }

    #[test]
    fn default_settings() {
        let s = CacheSettings::default();
        assert_eq!(s.ttl, Duration::from_secs(600));
        assert_eq!(s.min_refresh_interval, Duration::from_secs(30));
        assert_eq!(s.fetch_timeout, Duration::from_secs(10));
    }
}
