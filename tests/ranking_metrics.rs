mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use common::InMemoryRepos;
use topzonal::application::ranking::{
    METRIC_HIT, METRIC_MISS, METRIC_RECOMPUTE, PopularListingsService,
};
use topzonal::cache::{CacheConfig, RankingStore, StoreError};

/// Empty on the first read, filled on every read after it.
#[derive(Default)]
struct FilledWhileWaiting {
    reads: AtomicUsize,
}

#[async_trait]
impl RankingStore for FilledWhileWaiting {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(None);
        }
        Ok(Some("[]".to_string()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn recheck_hit_is_counted_as_a_hit() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let repos = Arc::new(InMemoryRepos::default());
    let service = PopularListingsService::new(
        repos.clone(),
        Arc::new(FilledWhileWaiting::default()),
        CacheConfig::default(),
        Duration::from_secs(5),
    );

    let ranking = service.get_popular_listings().await.unwrap();
    assert!(ranking.is_empty());
    assert_eq!(repos.popular_queries.load(Ordering::SeqCst), 0);

    let counter = |name: &str| {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .find(|(key, _, _, _)| key.key().name() == name)
            .map(|(_, _, _, value)| match value {
                DebugValue::Counter(count) => count,
                other => panic!("{name} is not a counter: {other:?}"),
            })
            .unwrap_or(0)
    };
    assert_eq!(counter(METRIC_MISS), 1);
    assert_eq!(counter(METRIC_HIT), 1);
    assert_eq!(counter(METRIC_RECOMPUTE), 0);
}
