//! Ranking cache configuration.

use std::time::Duration;

const DEFAULT_KEY: &str = "popular-listings";
const DEFAULT_TTL_SECONDS: u64 = 3600;
const DEFAULT_LIMIT: u32 = 10;
const DEFAULT_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Store key holding the serialized ranking.
    pub key: String,
    /// Expiry applied by the store on every write.
    pub ttl: Duration,
    /// Number of listings kept in the ranking.
    pub limit: u32,
    /// Upper bound for a single store round-trip.
    pub timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            ttl: Duration::from_secs(DEFAULT_TTL_SECONDS),
            limit: DEFAULT_LIMIT,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            key: settings.key.clone(),
            ttl: Duration::from_secs(settings.ttl_seconds.get()),
            limit: settings.limit.get(),
            timeout: Duration::from_millis(settings.timeout_ms.get()),
        }
    }
}
