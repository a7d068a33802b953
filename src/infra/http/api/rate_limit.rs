use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding-window limiter keyed by caller and route.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Record a request. On rejection returns the seconds until a slot frees up.
    pub fn check(&self, key: &str, route: &str) -> Result<(), u64> {
        self.check_at(key, route, Instant::now())
    }

    fn check_at(&self, key: &str, route: &str, now: Instant) -> Result<(), u64> {
        let bucket_key = format!("{key}:{route}");
        let window = self.window;

        let mut entry = self.buckets.entry(bucket_key).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        if entry.len() >= self.max_requests as usize {
            let retry_after = entry
                .first()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            return Err(retry_after.as_secs().max(1));
        }

        entry.push(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_past_limit_until_window_slides() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();

        assert!(limiter.check_at("user_1", "POST /api/listings", start).is_ok());
        assert!(limiter.check_at("user_1", "POST /api/listings", start).is_ok());
        let retry = limiter
            .check_at("user_1", "POST /api/listings", start + Duration::from_secs(10))
            .unwrap_err();
        assert_eq!(retry, 50);

        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("user_1", "POST /api/listings", later).is_ok());
    }

    #[test]
    fn buckets_are_per_user_and_route() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.check("user_1", "a").is_ok());
        assert!(limiter.check("user_2", "a").is_ok());
        assert!(limiter.check("user_1", "b").is_ok());
        assert!(limiter.check("user_1", "a").is_err());
    }
}
