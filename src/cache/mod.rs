//! Ranking cache infrastructure.
//!
//! The popular-listings ranking is served read-through from a shared
//! key-value store. This module holds the store port, the in-process store
//! used when no external cache is configured, and the per-key fill
//! coalescer that keeps concurrent misses from recomputing in parallel.

mod coalesce;
mod config;
mod lock;
mod memory;
mod store;

pub use coalesce::{Fill, FillCoalescer, FillFollower, FillLeader};
pub use config::CacheConfig;
pub use memory::MemoryRankingStore;
pub use store::{RankingStore, StoreError};
