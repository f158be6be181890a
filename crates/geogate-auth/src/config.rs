//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Upper bound for `cookie_ttl_secs`: one year.
pub const MAX_COOKIE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// jwt_secret = "change-me"
/// cookie_name = "jwt"
/// cookie_ttl_secs = 3600
///
/// [auth.hashing]
/// memory_kib = 19456
/// iterations = 2
/// parallelism = 1
///
/// [[auth.seed_users]]
/// login = "flip"
/// password = "flop"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret used to sign and verify HS256 tokens.
    pub jwt_secret: String,

    /// Name of the http-only cookie carrying the token after login.
    pub cookie_name: String,

    /// Lifetime of the login cookie in seconds.
    pub cookie_ttl_secs: u64,

    /// Argon2 cost parameters.
    pub hashing: HashingConfig,

    /// Users registered at startup.
    pub seed_users: Vec<SeedUser>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "gunmode".to_string(),
            cookie_name: "jwt".to_string(),
            cookie_ttl_secs: 3600,
            hashing: HashingConfig::default(),
            seed_users: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.is_empty() {
            return Err("auth.jwt_secret must not be empty".into());
        }
        if self.cookie_name.is_empty() {
            return Err("auth.cookie_name must not be empty".into());
        }
        if self.cookie_ttl_secs == 0 || self.cookie_ttl_secs > MAX_COOKIE_TTL_SECS {
            return Err(format!(
                "auth.cookie_ttl_secs must be between 1 and {MAX_COOKIE_TTL_SECS}"
            ));
        }
        self.hashing.validate()
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HashingConfig {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl HashingConfig {
    /// Cheapest parameters Argon2 accepts. Only meant for tests.
    pub const fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.iterations == 0 || self.parallelism == 0 {
            return Err("auth.hashing iterations and parallelism must be > 0".into());
        }
        if self.memory_kib < 8 * self.parallelism {
            return Err("auth.hashing.memory_kib must be at least 8 * parallelism".into());
        }
        Ok(())
    }
}

/// A login/password pair registered when the server starts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedUser {
    pub login: String,
    pub password: String,
}
