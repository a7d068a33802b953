//! Read-through cache for the popular-listings ranking.
//!
//! The ranking lives under a single store key with a fixed TTL. Reads that
//! find the key return it unchanged; misses recompute from the system of
//! record and write the result back. A failing or slow store never fails the
//! request: the ranking is computed directly instead.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::repos::{ListingsRepo, RepoError};
use crate::cache::{CacheConfig, Fill, FillCoalescer, RankingStore, StoreError};
use crate::domain::{entities::PopularListing, ranking::rank_popular};

const TARGET: &str = "topzonal::ranking";
pub const METRIC_HIT: &str = "topzonal_ranking_cache_hit_total";
pub const METRIC_MISS: &str = "topzonal_ranking_cache_miss_total";
pub const METRIC_UNAVAILABLE: &str = "topzonal_ranking_cache_unavailable_total";
pub const METRIC_RECOMPUTE: &str = "topzonal_ranking_recompute_total";
pub const METRIC_COALESCED: &str = "topzonal_ranking_coalesced_total";

#[derive(Debug, Clone, Error)]
pub enum RankingError {
    #[error("failed to compute popular listings")]
    Compute(#[from] RepoError),
    #[error("popular listings query exceeded {0:?}")]
    ComputeTimeout(Duration),
}

enum Lookup {
    Hit(Vec<PopularListing>),
    Miss,
    Unavailable,
}

pub struct PopularListingsService {
    listings: Arc<dyn ListingsRepo>,
    store: Arc<dyn RankingStore>,
    coalescer: FillCoalescer<Result<Vec<PopularListing>, RankingError>>,
    config: CacheConfig,
    query_timeout: Duration,
}

impl PopularListingsService {
    pub fn new(
        listings: Arc<dyn ListingsRepo>,
        store: Arc<dyn RankingStore>,
        config: CacheConfig,
        query_timeout: Duration,
    ) -> Self {
        Self {
            listings,
            store,
            coalescer: FillCoalescer::new(),
            config,
            query_timeout,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub async fn get_popular_listings(&self) -> Result<Vec<PopularListing>, RankingError> {
        match self.lookup().await {
            Lookup::Hit(ranking) => {
                counter!(METRIC_HIT).increment(1);
                return Ok(ranking);
            }
            Lookup::Unavailable => return self.compute().await,
            Lookup::Miss => counter!(METRIC_MISS).increment(1),
        }

        let leader = match self.coalescer.join(&self.config.key) {
            Fill::Leader(leader) => leader,
            Fill::Follower(follower) => {
                counter!(METRIC_COALESCED).increment(1);
                return match follower.outcome().await {
                    Some(outcome) => outcome,
                    // The leader was cancelled before finishing.
                    None => self.compute().await,
                };
            }
        };

        let outcome = self.fill().await;
        leader.complete(outcome.clone());
        outcome
    }

    async fn fill(&self) -> Result<Vec<PopularListing>, RankingError> {
        // A fill that finished between our lookup and joining already wrote the key.
        match self.lookup().await {
            Lookup::Hit(ranking) => {
                counter!(METRIC_HIT).increment(1);
                return Ok(ranking);
            }
            Lookup::Unavailable => return self.compute().await,
            Lookup::Miss => {}
        }

        let ranking = self.compute().await?;
        self.write_back(&ranking).await;
        Ok(ranking)
    }

    async fn lookup(&self) -> Lookup {
        let key = self.config.key.as_str();
        let raw = match self.with_store_timeout(self.store.get(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Miss,
            Err(err) => {
                counter!(METRIC_UNAVAILABLE).increment(1);
                warn!(
                    target: TARGET,
                    key,
                    error = %err,
                    "CacheUnavailable: serving ranking without cache"
                );
                return Lookup::Unavailable;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(ranking) => Lookup::Hit(ranking),
            Err(err) => {
                warn!(
                    target: TARGET,
                    key,
                    error = %err,
                    "Discarding undecodable cached ranking"
                );
                Lookup::Miss
            }
        }
    }

    async fn compute(&self) -> Result<Vec<PopularListing>, RankingError> {
        counter!(METRIC_RECOMPUTE).increment(1);
        let limit = self.config.limit;
        let rows = tokio::time::timeout(self.query_timeout, self.listings.list_popular(limit))
            .await
            .map_err(|_| RankingError::ComputeTimeout(self.query_timeout))??;

        debug!(target: TARGET, count = rows.len(), "Recomputed popular listings");
        Ok(rank_popular(rows, limit as usize))
    }

    async fn write_back(&self, ranking: &[PopularListing]) {
        let key = self.config.key.as_str();
        let payload = match serde_json::to_string(ranking) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(target: TARGET, key, error = %err, "Failed to encode ranking");
                return;
            }
        };

        if let Err(err) = self
            .with_store_timeout(self.store.set(key, payload, self.config.ttl))
            .await
        {
            counter!(METRIC_UNAVAILABLE).increment(1);
            warn!(
                target: TARGET,
                key,
                error = %err,
                "CacheUnavailable: ranking not written back"
            );
        }
    }

    async fn with_store_timeout<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.config.timeout, op)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.config.timeout)))
    }
}
