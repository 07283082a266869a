use secrecy::{ExposeSecret, SecretString};
use slashkit_core::config::SlackConfig;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("Invalid slack token")]
    InvalidToken,
}

/// Checks the verification token presented with each command against the
/// shared secret configured at startup.
#[derive(Clone, Debug, Default)]
pub struct TokenValidator {
    secret: Option<SecretString>,
}

impl TokenValidator {
    /// An empty secret is treated the same as no secret: open mode.
    pub fn new(secret: Option<SecretString>) -> Self {
        Self { secret: secret.filter(|secret| !secret.expose_secret().is_empty()) }
    }

    pub fn from_config(config: &SlackConfig) -> Self {
        Self::new(config.active_token().cloned())
    }

    /// Validator that accepts every request.
    pub fn open() -> Self {
        Self { secret: None }
    }

    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    pub fn validate(&self, presented: Option<&str>) -> Result<(), AuthenticationError> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };
        let Some(presented) = presented else {
            return Err(AuthenticationError::InvalidToken);
        };

        // Slices of different length compare unequal; only the length leaks.
        if bool::from(secret.expose_secret().as_bytes().ct_eq(presented.as_bytes())) {
            Ok(())
        } else {
            Err(AuthenticationError::InvalidToken)
        }
    }
}
