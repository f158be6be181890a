//! # geogate-auth
//!
//! Authentication for the GeoGate gateway.
//!
//! This crate provides:
//! - An in-memory credential store safe for concurrent register/login traffic
//! - Argon2id password hashing with configurable cost
//! - HS256 bearer tokens carrying a `login` claim
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration
//! - [`password`] - Password hashing and verification
//! - [`store`] - Credential storage
//! - [`token`] - Token issuing and verification
//! - [`service`] - Register/login entry points tying the above together

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

pub use config::{AuthConfig, HashingConfig, SeedUser};
pub use error::AuthError;
pub use password::PasswordHashing;
pub use service::{AuthService, IssuedToken, Registration};
pub use store::CredentialStore;
pub use token::{JwtError, JwtService, LoginClaims};
