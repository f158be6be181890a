//! Cache-aside decorator over an [`AddressLookup`].
//!
//! ```text
//! get(key) ─┬─ Found    ──▶ decode ──▶ return            (no provider call)
//!           ├─ NotFound ──▶ provider ─┬─ Ok  ──▶ set(key) ──▶ return
//!           │                         └─ Err ──▶ return error (no write)
//!           └─ Error    ──▶ return CacheError
//! ```
//!
//! A failed `set` is logged and counted but never turns a provider result into
//! an error. Nothing is retried.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Address, AddressLookup, LookupError};
use crate::cache::{CacheError, CacheLookup, CacheStore};
use crate::metrics::Metrics;

/// Deterministic cache key for a lookup.
///
/// Parameters are length-prefixed, so `geocode("1", "23")` and
/// `geocode("12", "3")` produce `geo_code:1:1|2:23` and `geo_code:2:12|1:3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: &'static str,
    key: String,
}

impl CacheKey {
    pub const SEARCH: &'static str = "address_search";
    pub const GEOCODE: &'static str = "geo_code";

    pub fn search(query: &str) -> Self {
        Self::build(Self::SEARCH, &[query])
    }

    pub fn geocode(lat: &str, lng: &str) -> Self {
        Self::build(Self::GEOCODE, &[lat, lng])
    }

    fn build(operation: &'static str, params: &[&str]) -> Self {
        let encoded = params
            .iter()
            .map(|p| format!("{}:{}", p.len(), p))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            operation,
            key: format!("{operation}:{encoded}"),
        }
    }

    /// Operation name used as the metrics label.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// Serves lookups from the cache, falling back to `inner` on a miss.
pub struct CachedLookup {
    inner: Arc<dyn AddressLookup>,
    cache: Arc<dyn CacheStore>,
    metrics: Metrics,
    ttl: Option<Duration>,
}

impl CachedLookup {
    pub fn new(
        inner: Arc<dyn AddressLookup>,
        cache: Arc<dyn CacheStore>,
        metrics: Metrics,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            inner,
            cache,
            metrics,
            ttl,
        }
    }

    async fn lookup<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Vec<Address>, LookupError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Address>, LookupError>>,
    {
        let operation = key.operation();

        let started = Instant::now();
        let cached = self.cache.get(key.as_str()).await;
        self.metrics
            .record_cache_duration(operation, started.elapsed());

        match cached {
            CacheLookup::Found(bytes) => {
                let addresses = rmp_serde::from_slice::<Vec<Address>>(&bytes)
                    .map_err(|e| CacheError::Corrupt(format!("{key}: {e}")))?;
                debug!(key = %key, count = addresses.len(), "lookup served from cache");
                return Ok(addresses);
            }
            CacheLookup::Error(e) => {
                warn!(key = %key, backend = self.cache.backend_name(), error = %e, "cache read failed");
                return Err(e.into());
            }
            CacheLookup::NotFound => {}
        }

        let started = Instant::now();
        let result = fetch().await;
        self.metrics
            .record_provider_duration(operation, started.elapsed());
        let addresses = result?;

        self.populate(&key, &addresses).await;
        Ok(addresses)
    }

    async fn populate(&self, key: &CacheKey, addresses: &[Address]) {
        let written = match rmp_serde::to_vec_named(addresses) {
            Ok(bytes) => self.cache.set(key.as_str(), bytes, self.ttl).await,
            Err(e) => Err(CacheError::Corrupt(e.to_string())),
        };

        if let Err(e) = written {
            warn!(key = %key, error = %e, "failed to cache lookup result");
            self.metrics.record_cache_write_failure(key.operation());
        }
    }
}

#[async_trait]
impl AddressLookup for CachedLookup {
    async fn search(&self, query: &str) -> Result<Vec<Address>, LookupError> {
        self.lookup(CacheKey::search(query), || self.inner.search(query))
            .await
    }

    async fn geocode(&self, lat: &str, lng: &str) -> Result<Vec<Address>, LookupError> {
        self.lookup(CacheKey::geocode(lat, lng), || self.inner.geocode(lat, lng))
            .await
    }
}
