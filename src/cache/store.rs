//! Key-value store port for cached rankings.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache store did not answer within {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Shared store holding serialized rankings.
///
/// Values are opaque strings; callers own the encoding. Expiry is the store's
/// responsibility: once `ttl` has elapsed after a `set`, `get` must report the
/// key as absent.
#[async_trait]
pub trait RankingStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;
}
