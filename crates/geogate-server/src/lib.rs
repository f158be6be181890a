pub mod cache;
pub mod config;
pub mod gateway;
pub mod geo;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;

pub use cache::{CacheError, CacheLookup, CacheStore, DynCache, MemoryCache, RedisCache, create_cache};
pub use crate::config::{AppConfig, CacheConfig, GeoConfig, RedisConfig, ServerConfig, UpstreamConfig};
pub use gateway::{GatewayError, ReverseProxy};
pub use geo::{Address, AddressLookup, CacheKey, CachedLookup, DadataClient, DynLookup, LookupError};
pub use crate::metrics::{Metrics, MetricsOptions};
pub use observability::init_tracing;
pub use server::{AppState, GeogateServer, ServerBuilder, SessionCookie, build_app};
