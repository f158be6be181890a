//! Register and login entry points.
//!
//! `AuthService` owns the credential store exclusively; nothing else in the
//! gateway reads or writes credentials. Argon2 work runs on the blocking pool
//! so a burst of logins cannot stall the async workers, and the store's lock is
//! never held across a hash computation.

use tracing::{debug, info};

use crate::config::{AuthConfig, SeedUser};
use crate::error::AuthError;
use crate::password::PasswordHashing;
use crate::store::CredentialStore;
use crate::token::{JwtService, LoginClaims};

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Opaque numeric identifier generated for this registration.
    pub id: u32,
}

/// Token issued by a successful login.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub login: String,
    pub token: String,
}

/// Registers users, checks their passwords and issues bearer tokens.
#[derive(Debug)]
pub struct AuthService {
    store: CredentialStore,
    hashing: PasswordHashing,
    jwt: JwtService,
}

impl AuthService {
    /// Build the service from configuration with an empty credential store.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let hashing = PasswordHashing::new(&config.hashing)?;
        let jwt = JwtService::hs256(config.jwt_secret.as_bytes())?;
        Ok(Self::new(CredentialStore::new(), hashing, jwt))
    }

    pub fn new(store: CredentialStore, hashing: PasswordHashing, jwt: JwtService) -> Self {
        Self {
            store,
            hashing,
            jwt,
        }
    }

    /// Hash `password` and store it for `login`, overwriting any previous credential.
    pub async fn register(&self, login: &str, password: &str) -> Result<Registration, AuthError> {
        let hashing = self.hashing.clone();
        let password = password.to_owned();
        let hash = tokio::task::spawn_blocking(move || hashing.hash(&password))
            .await
            .map_err(|e| AuthError::internal(format!("hashing task failed: {e}")))??;

        let replaced = self.store.upsert(login, hash).await;
        let id = rand::random::<u32>();
        info!(login = %login, id, replaced, "User registered");

        Ok(Registration { id })
    }

    /// Check `password` against the stored credential and issue a token.
    ///
    /// # Errors
    ///
    /// `AuthError::UnknownLogin` if no credential exists for `login`,
    /// `AuthError::WrongPassword` if the password does not match.
    pub async fn login(&self, login: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let Some(hash) = self.store.password_hash(login).await else {
            debug!(login = %login, "Login for unknown user");
            return Err(AuthError::UnknownLogin);
        };

        let hashing = self.hashing.clone();
        let password = password.to_owned();
        let matches = tokio::task::spawn_blocking(move || hashing.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::internal(format!("verification task failed: {e}")))??;

        if !matches {
            debug!(login = %login, "Login with wrong password");
            return Err(AuthError::WrongPassword);
        }

        let token = self.jwt.issue(login)?;
        info!(login = %login, "Token issued");

        Ok(IssuedToken {
            login: login.to_string(),
            token,
        })
    }

    /// Verify a bearer token presented on a protected route.
    pub fn verify_token(&self, token: &str) -> Result<LoginClaims, AuthError> {
        Ok(self.jwt.verify(token)?)
    }

    /// Register every seed user.
    pub async fn seed(&self, users: &[SeedUser]) -> Result<(), AuthError> {
        for user in users {
            self.register(&user.login, &user.password).await?;
        }
        Ok(())
    }

    /// Read access to the credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }
}
