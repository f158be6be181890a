//! Redis cache backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use redis::AsyncCommands;

use super::{CacheError, CacheLookup, CacheStore, DynCache, MemoryCache};
use crate::config::RedisConfig;

/// Cache on a shared Redis instance.
///
/// Every GET and SET, connection acquisition included, is bounded by `timeout`
/// and attempted once.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    timeout: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("status", &self.pool.status())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RedisCache {
    /// Build the pool. No connection is opened until first use.
    pub fn new(config: &RedisConfig) -> Result<Self, CacheError> {
        let timeout = config.timeout();

        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Configuration(e.to_string()))?;

        Ok(Self { pool, timeout })
    }

    /// Try to open a connection up to `attempts` times with exponential backoff.
    ///
    /// Returns whether a connection was established. Failure only means the
    /// first request will connect on demand.
    pub async fn warm_up(&self, attempts: u32) -> bool {
        let mut backoff = Duration::from_millis(100);
        for attempt in 1..=attempts.max(1) {
            match tokio::time::timeout(self.timeout, self.pool.get()).await {
                Ok(Ok(_)) => {
                    tracing::info!(attempt, "Connected to Redis");
                    return true;
                }
                Ok(Err(e)) => {
                    tracing::warn!(attempt, error = %e, "Redis connection attempt failed");
                }
                Err(_) => {
                    tracing::warn!(attempt, timeout = ?self.timeout, "Redis connection attempt timed out");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
        false
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheLookup {
        let op = async {
            let mut conn = self.connection().await?;
            conn.get::<_, Option<Vec<u8>>>(key)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))
        };

        match tokio::time::timeout(self.timeout, op).await {
            Ok(Ok(Some(bytes))) => {
                tracing::debug!(key = %key, "cache hit (redis)");
                CacheLookup::Found(bytes)
            }
            Ok(Ok(None)) => {
                tracing::debug!(key = %key, "cache miss (redis)");
                CacheLookup::NotFound
            }
            Ok(Err(e)) => CacheLookup::Error(e),
            Err(_) => CacheLookup::Error(CacheError::Timeout(self.timeout)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        let op = async {
            let mut conn = self.connection().await?;
            let result = match ttl {
                Some(ttl) => {
                    conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                        .await
                }
                None => conn.set::<_, _, ()>(key, value).await,
            };
            result.map_err(|e| CacheError::Command(e.to_string()))
        };

        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))??;
        tracing::debug!(key = %key, ttl = ?ttl, "cache set (redis)");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Create the cache backend from configuration.
///
/// With Redis disabled, or when the pool cannot be built from the configured
/// URL, lookups are cached in process memory. An unreachable Redis does not
/// trigger the fallback: the pool is kept and reconnects on demand.
pub async fn create_cache(config: &RedisConfig) -> DynCache {
    if !config.enabled {
        tracing::info!("Redis disabled, using in-memory cache");
        return Arc::new(MemoryCache::new());
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let cache = match RedisCache::new(config) {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to in-memory cache."
            );
            return Arc::new(MemoryCache::new());
        }
    };

    if !cache.warm_up(config.connect_attempts).await {
        tracing::warn!(
            attempts = config.connect_attempts,
            "Redis unreachable at startup; lookups will fail until it recovers"
        );
    }

    Arc::new(cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> RedisConfig {
        RedisConfig {
            enabled: true,
            // Port 1 on loopback refuses connections immediately.
            url: "redis://127.0.0.1:1".into(),
            pool_size: 2,
            timeout_ms: 200,
            connect_attempts: 1,
        }
    }

    #[tokio::test]
    async fn test_disabled_uses_memory() {
        let config = RedisConfig {
            enabled: false,
            ..Default::default()
        };
        let cache = create_cache(&config).await;
        assert_eq!(cache.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_invalid_url_falls_back_to_memory() {
        let config = RedisConfig {
            url: "not-a-redis-url".into(),
            ..unreachable_config()
        };
        let cache = create_cache(&config).await;
        assert_eq!(cache.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_unreachable_redis_reports_errors_not_misses() {
        let cache = create_cache(&unreachable_config()).await;
        assert_eq!(cache.backend_name(), "redis");

        assert!(matches!(cache.get("k").await, CacheLookup::Error(_)));
        assert!(cache.set("k", b"v".to_vec(), None).await.is_err());
    }
}
