//! Refresh Token Store Port - durable home for OAuth refresh tokens.
//!
//! Token endpoints may rotate the refresh token on every exchange; the
//! refreshing strategy saves the new value here so the next process start
//! does not reuse a revoked grant.

use async_trait::async_trait;
use secrecy::Secret;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefreshTokenStoreError {
    #[error("refresh token store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("refresh token store is corrupt: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Returns the stored refresh token for `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<Secret<String>>, RefreshTokenStoreError>;

    /// Stores `token` under `key`, replacing any previous value.
    async fn save(&self, key: &str, token: &Secret<String>) -> Result<(), RefreshTokenStoreError>;
}
