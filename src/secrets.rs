//! Secret loading for exchange API credentials.
//!
//! Secrets are returned as `Zeroizing<String>` so they are wiped from
//! memory when dropped, and are never logged.

use std::env;
use tracing::warn;
use zeroize::Zeroizing;

/// Error type for secret loading operations
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Secret validation failed: {0}")]
    ValidationFailed(String),
}

/// Load a secret from an environment variable.
///
/// Returns a `Zeroizing<String>`; rejects empty values rather than carrying
/// an unusable credential into request signing.
pub fn load_secret(name: &str) -> Result<Zeroizing<String>, SecretError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(Zeroizing::new(value)),
        Ok(_) => Err(SecretError::ValidationFailed(format!(
            "{} is set but empty",
            name
        ))),
        Err(_) => Err(SecretError::NotFound(name.to_string())),
    }
}

/// Load an optional secret, warning when it is absent.
pub fn load_secret_optional(name: &str) -> Option<Zeroizing<String>> {
    match load_secret(name) {
        Ok(secret) => Some(secret),
        Err(e) => {
            warn!("Secret {} unavailable: {}", name, e);
            None
        }
    }
}
