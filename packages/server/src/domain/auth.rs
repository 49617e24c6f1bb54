//! Credential verification port.

use async_trait::async_trait;

use super::{entity::Identity, error::AuthError};

/// Validates a caller-supplied credential and yields the identity behind it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
