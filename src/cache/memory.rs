//! In-process ranking store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::lock::{rw_read, rw_write};
use super::store::{RankingStore, StoreError};

const SOURCE: &str = "cache::memory";

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Map-backed store with per-entry expiry measured on the tokio clock.
///
/// Expired entries are dropped lazily on the next write.
#[derive(Default)]
pub struct MemoryRankingStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryRankingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RankingStore for MemoryRankingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let entries = rw_read(&self.entries, SOURCE, "get");
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "set");
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = MemoryRankingStore::new();
        store
            .set("k", "v".to_string(), Duration::from_secs(3600))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let store = MemoryRankingStore::new();
        let ttl = Duration::from_secs(60);
        store.set("k", "old".to_string(), ttl).await.unwrap();
        store.set("k", "new".to_string(), ttl).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }
}
