//! Authentication error types.

use crate::token::JwtError;

/// Errors that can occur during registration, login and token verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credential is stored for the login.
    #[error("user not found")]
    UnknownLogin,

    /// A credential exists but the password does not match it.
    #[error("wrong password")]
    WrongPassword,

    /// The bearer token is missing, malformed or carries a bad signature.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// Hashing or parsing a password hash failed.
    #[error("Password hashing error: {message}")]
    Hashing {
        /// Description of the hashing error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Hashing` error.
    #[must_use]
    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` when the caller presented bad credentials.
    ///
    /// Unknown logins and wrong passwords share one status code for
    /// clients; everything else is a server-side fault.
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::UnknownLogin | Self::WrongPassword)
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError { message } | JwtError::InvalidKey { message } => {
                Self::Internal { message }
            }
            other => Self::invalid_token(other.to_string()),
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::hashing(err.to_string())
    }
}
