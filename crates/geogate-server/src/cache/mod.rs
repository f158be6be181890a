//! Key-value cache backing geo lookups.
//!
//! ## Backends
//!
//! - **Redis**: shared across gateway instances; the pool connects lazily so a
//!   cache outage never prevents startup
//! - **Memory**: per-instance DashMap, used when Redis is disabled and in tests
//!
//! ## Lookup outcomes
//!
//! A read is one of three structurally distinct outcomes:
//!
//! ```text
//! get(key) ──▶ Found(bytes)   entry present
//!          ├─▶ NotFound       no entry; callers fall back to the source
//!          └─▶ Error(cause)   backend failed; callers must not treat it as a miss
//! ```

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use memory::{CachedEntry, MemoryCache};
pub use self::redis::{RedisCache, create_cache};

/// Errors raised by a cache backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// No connection to the backend could be obtained.
    #[error("cache connection failed: {0}")]
    Connection(String),

    /// The backend rejected or failed a command.
    #[error("cache command failed: {0}")]
    Command(String),

    /// The operation did not complete in time.
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored value could not be decoded.
    #[error("cached value is corrupt: {0}")]
    Corrupt(String),

    /// The backend could not be set up from its configuration.
    #[error("cache configuration error: {0}")]
    Configuration(String),
}

/// Result of a cache read.
#[derive(Debug)]
pub enum CacheLookup {
    Found(Vec<u8>),
    NotFound,
    Error(CacheError),
}

impl CacheLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Byte-oriented key-value cache.
///
/// `set` overwrites any live entry for the key. `ttl = None` stores the entry
/// until it is overwritten.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheLookup;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Type alias for a shared cache backend.
pub type DynCache = Arc<dyn CacheStore>;
