//! Redis-backed ranking store.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::{RankingStore, StoreError};

use super::error::InfraError;

const TARGET: &str = "topzonal::cache::redis";

/// `GET` / `SET EX` against a shared Redis instance.
///
/// The multiplexed connection is opened on first use and dropped after any
/// command error so the next call reconnects.
pub struct RedisRankingStore {
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisRankingStore {
    pub fn open(url: &str) -> Result<Self, InfraError> {
        let client = Client::open(url)
            .map_err(|err| InfraError::cache(format!("invalid cache.redis_url: {err}")))?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            return Ok(connection.clone());
        }

        let connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::unavailable)?;
        debug!(target: TARGET, "Opened redis connection");
        *slot = Some(connection.clone());
        Ok(connection)
    }

    async fn reset(&self, err: redis::RedisError) -> StoreError {
        *self.connection.lock().await = None;
        StoreError::unavailable(err)
    }
}

#[async_trait]
impl RankingStore for RedisRankingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection().await?;
        match connection.get::<_, Option<String>>(key).await {
            Ok(value) => Ok(value),
            Err(err) => Err(self.reset(err).await),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let mut connection = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        match connection.set_ex::<_, _, ()>(key, value, seconds).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.reset(err).await),
        }
    }
}
