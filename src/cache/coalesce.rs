use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::lock::mutex_lock;

const TARGET: &str = "topzonal::cache::coalesce";

type Slot<V> = Arc<watch::Sender<Option<V>>>;
type Inflight<V> = Arc<Mutex<HashMap<String, Slot<V>>>>;

/// Collapses concurrent fills of the same key within this process.
///
/// The first caller to join a key becomes the leader and computes the value;
/// callers joining while that fill is in flight follow it and receive the
/// leader's outcome, whether it succeeded or failed.
pub struct FillCoalescer<V> {
    inflight: Inflight<V>,
}

impl<V> Default for FillCoalescer<V> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

pub enum Fill<V> {
    Leader(FillLeader<V>),
    Follower(FillFollower<V>),
}

impl<V: Clone> FillCoalescer<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, key: &str) -> Fill<V> {
        let mut inflight = mutex_lock(&self.inflight, TARGET, "join");
        if let Some(slot) = inflight.get(key) {
            return Fill::Follower(FillFollower {
                outcome: slot.subscribe(),
            });
        }

        let slot = Arc::new(watch::channel(None).0);
        inflight.insert(key.to_string(), Arc::clone(&slot));
        Fill::Leader(FillLeader {
            key: key.to_string(),
            slot,
            inflight: Arc::clone(&self.inflight),
        })
    }
}

/// Owns an in-flight fill. Dropping it without [`FillLeader::complete`]
/// releases the key and leaves followers to fill on their own.
pub struct FillLeader<V> {
    key: String,
    slot: Slot<V>,
    inflight: Inflight<V>,
}

impl<V> FillLeader<V> {
    pub fn complete(self, outcome: V) {
        self.slot.send_replace(Some(outcome));
    }
}

impl<V> Drop for FillLeader<V> {
    fn drop(&mut self) {
        let mut inflight = mutex_lock(&self.inflight, TARGET, "release");
        if inflight
            .get(&self.key)
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot))
        {
            inflight.remove(&self.key);
        }
    }
}

pub struct FillFollower<V> {
    outcome: watch::Receiver<Option<V>>,
}

impl<V: Clone> FillFollower<V> {
    /// Waits for the leader. `None` means the leader went away without an
    /// outcome.
    pub async fn outcome(mut self) -> Option<V> {
        match self.outcome.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn followers_receive_the_leader_outcome() {
        let coalescer = FillCoalescer::<Result<u32, String>>::new();
        let Fill::Leader(leader) = coalescer.join("popular-listings") else {
            panic!("first join should lead");
        };
        let Fill::Follower(follower) = coalescer.join("popular-listings") else {
            panic!("second join should follow");
        };

        let waiting = tokio::spawn(follower.outcome());
        tokio::time::sleep(Duration::from_millis(5)).await;
        leader.complete(Err("connection refused".to_string()));

        let outcome = waiting.await.unwrap();
        assert_eq!(outcome, Some(Err("connection refused".to_string())));
    }

    #[tokio::test]
    async fn key_is_released_once_the_fill_completes() {
        let coalescer = FillCoalescer::<u32>::new();
        let Fill::Leader(leader) = coalescer.join("k") else {
            panic!("first join should lead");
        };
        leader.complete(7);

        assert!(matches!(coalescer.join("k"), Fill::Leader(_)));
    }

    #[tokio::test]
    async fn abandoned_fill_releases_followers() {
        let coalescer = FillCoalescer::<u32>::new();
        let leader = coalescer.join("k");
        let Fill::Follower(follower) = coalescer.join("k") else {
            panic!("second join should follow");
        };
        drop(leader);

        assert_eq!(follower.outcome().await, None);
        assert!(matches!(coalescer.join("k"), Fill::Leader(_)));
    }

    #[tokio::test]
    async fn different_keys_fill_independently() {
        let coalescer = FillCoalescer::<u32>::new();
        let _first = coalescer.join("a");
        assert!(matches!(coalescer.join("b"), Fill::Leader(_)));
    }
}
