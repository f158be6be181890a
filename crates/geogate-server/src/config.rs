use geogate_auth::AuthConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Service receiving every request that matches no local route
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    /// Lookup cache behaviour
    #[serde(default)]
    pub cache: CacheConfig,
    /// External geocoding provider
    #[serde(default)]
    pub geo: GeoConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.shutdown_grace_secs == 0 {
            return Err("server.shutdown_grace_secs must be > 0".into());
        }
        // Upstream validation
        if self.upstream.url.trim().is_empty() {
            return Err("upstream.url must not be empty".into());
        }
        url::Url::parse(&self.upstream.url).map_err(|e| format!("upstream.url is invalid: {e}"))?;
        if self.upstream.timeout_ms == 0 {
            return Err("upstream.timeout_ms must be > 0".into());
        }
        // Redis validation
        if self.redis.enabled {
            if self.redis.url.is_empty() {
                return Err("redis.enabled=true requires redis.url".into());
            }
            if self.redis.pool_size == 0 {
                return Err("redis.pool_size must be > 0".into());
            }
            if self.redis.timeout_ms == 0 {
                return Err("redis.timeout_ms must be > 0".into());
            }
        }
        if self.cache.ttl_secs == Some(0) {
            return Err("cache.ttl_secs must be > 0 when set".into());
        }
        // Geo provider validation
        url::Url::parse(&self.geo.base_url).map_err(|e| format!("geo.base_url is invalid: {e}"))?;
        if self.geo.timeout_ms == 0 {
            return Err("geo.timeout_ms must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Auth validation
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_grace_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// How long in-flight requests may run after a termination signal
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    10 * 1024 * 1024
}
fn default_shutdown_grace_secs() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to, e.g. `http://hugo:1313`
    #[serde(default = "default_upstream_url")]
    pub url: String,
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_upstream_url() -> String {
    "http://hugo:1313".into()
}
fn default_upstream_timeout_ms() -> u64 {
    30_000
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_ms: default_upstream_timeout_ms(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Redis configuration for the lookup cache.
///
/// When disabled, lookups are cached in process memory instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,
    /// Upper bound for a single GET/SET, connection acquisition included
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
    /// Ping attempts made at startup before giving up on warming the pool
    #[serde(default = "default_redis_connect_attempts")]
    pub connect_attempts: u32,
}

fn default_redis_enabled() -> bool {
    true
}
fn default_redis_url() -> String {
    "redis://redis:6379".into()
}
fn default_redis_pool_size() -> usize {
    16
}
fn default_redis_timeout_ms() -> u64 {
    1_000
}
fn default_redis_connect_attempts() -> u32 {
    3
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
            connect_attempts: default_redis_connect_attempts(),
        }
    }
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    /// Expiry for cached lookups. Unset means entries live until overwritten.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    #[serde(default = "default_geo_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default = "default_geo_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_geo_base_url() -> String {
    "https://suggestions.dadata.ru/suggestions/api/4_1/rs".into()
}
fn default_geo_timeout_ms() -> u64 {
    10_000
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            base_url: default_geo_base_url(),
            api_key: String::new(),
            secret_key: None,
            timeout_ms: default_geo_timeout_ms(),
        }
    }
}

impl GeoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    //! Where the configuration comes from and how its layers merge.
    //!
    //! A TOML file is read first, then `GEOGATE__SECTION__KEY` environment
    //! variables override it key by key.

    use std::fmt;
    use std::path::{Path, PathBuf};

    use config::{Config, Environment, File, FileFormat};

    use super::AppConfig;

    pub const DEFAULT_PATH: &str = "geogate.toml";
    pub const PATH_ENV: &str = "GEOGATE_CONFIG";
    const ENV_PREFIX: &str = "GEOGATE";

    /// The configuration file to read and whether it has to exist.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ConfigLocation {
        /// `--config <path>` on the command line.
        Argument(PathBuf),
        /// The `GEOGATE_CONFIG` environment variable.
        Environment(PathBuf),
        /// `geogate.toml` in the working directory; skipped when absent.
        Default,
    }

    impl ConfigLocation {
        /// Pick the file from command-line arguments (program name excluded),
        /// falling back to the value of `GEOGATE_CONFIG`.
        pub fn resolve(args: impl IntoIterator<Item = String>, env_path: Option<String>) -> Self {
            let mut args = args.into_iter();
            while let Some(arg) = args.next() {
                if let Some(path) = arg.strip_prefix("--config=") {
                    return Self::Argument(path.into());
                }
                if arg == "--config" {
                    if let Some(path) = args.next() {
                        return Self::Argument(path.into());
                    }
                }
            }
            match env_path {
                Some(path) if !path.is_empty() => Self::Environment(path.into()),
                _ => Self::Default,
            }
        }

        pub fn from_process() -> Self {
            Self::resolve(std::env::args().skip(1), std::env::var(PATH_ENV).ok())
        }

        pub fn path(&self) -> &Path {
            match self {
                Self::Argument(path) | Self::Environment(path) => path,
                Self::Default => Path::new(DEFAULT_PATH),
            }
        }

        pub fn is_required(&self) -> bool {
            !matches!(self, Self::Default)
        }

        pub fn load(&self) -> Result<AppConfig, String> {
            load_from(self.path(), self.is_required())
        }
    }

    impl fmt::Display for ConfigLocation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Argument(_) => f.write_str("--config"),
                Self::Environment(_) => f.write_str(PATH_ENV),
                Self::Default => f.write_str("default"),
            }
        }
    }

    /// Load `path`, or the optional `geogate.toml` when `None`.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        match path {
            Some(path) => load_from(Path::new(path), true),
            None => load_from(Path::new(DEFAULT_PATH), false),
        }
    }

    fn load_from(path: &Path, required: bool) -> Result<AppConfig, String> {
        if required && !path.exists() {
            return Err(format!("config file not found: {}", path.display()));
        }

        let cfg: AppConfig = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?
            .try_deserialize()
            .map_err(|e| format!("invalid configuration in {}: {e}", path.display()))?;

        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.addr().port(), 8080);
        assert_eq!(cfg.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(cfg.cache.ttl(), None);
    }

    #[test]
    fn test_rejects_bad_upstream() {
        let mut cfg = AppConfig::default();
        cfg.upstream.url = "not a url".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let mut cfg = AppConfig::default();
        cfg.cache.ttl_secs = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_unparseable_host_falls_back_to_any() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "localhost".into();
        assert_eq!(cfg.addr().ip().to_string(), "0.0.0.0");
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_config_location_precedence() {
        use loader::ConfigLocation;

        assert_eq!(
            ConfigLocation::resolve(args(&["--config", "a.toml"]), Some("b.toml".into())),
            ConfigLocation::Argument("a.toml".into())
        );
        assert_eq!(
            ConfigLocation::resolve(args(&["--config=a.toml"]), None),
            ConfigLocation::Argument("a.toml".into())
        );
        assert_eq!(
            ConfigLocation::resolve(args(&[]), Some("b.toml".into())),
            ConfigLocation::Environment("b.toml".into())
        );
        assert_eq!(
            ConfigLocation::resolve(args(&["--config"]), Some(String::new())),
            ConfigLocation::Default
        );
    }

    #[test]
    fn test_only_default_location_is_optional() {
        use loader::ConfigLocation;

        assert!(!ConfigLocation::Default.is_required());
        assert_eq!(ConfigLocation::Default.path(), std::path::Path::new("geogate.toml"));
        assert!(ConfigLocation::Environment("x.toml".into()).is_required());
    }
}
