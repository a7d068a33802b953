//! One-way projection of listings into the external search index.
//!
//! The mirror is best-effort: callers decide what to do with a failure, and
//! nothing here ever touches the system of record.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{ListingsRepo, RepoError};
use crate::domain::{entities::ListingRecord, search::SearchIndexEntry};

const TARGET: &str = "topzonal::mirror";
pub const METRIC_FAILURE: &str = "topzonal_mirror_failure_total";
const REINDEX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Error)]
pub enum SearchIndexError {
    #[error("search index request failed: {0}")]
    Transport(String),
    #[error("search index answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("object not present in search index")]
    NotFound,
}

/// Port to the hosted search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or fully replace the document with `entry.object_id`.
    async fn save_object(&self, entry: &SearchIndexEntry) -> Result<(), SearchIndexError>;

    async fn delete_object(&self, object_id: &str) -> Result<(), SearchIndexError>;
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error(transparent)]
    Index(#[from] SearchIndexError),
    #[error("search index did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub indexed: usize,
    pub failed: usize,
}

pub struct IndexMirror {
    index: Arc<dyn SearchIndex>,
    timeout: Duration,
}

impl IndexMirror {
    pub fn new(index: Arc<dyn SearchIndex>, timeout: Duration) -> Self {
        Self { index, timeout }
    }

    pub async fn upsert(&self, listing: &ListingRecord) -> Result<(), MirrorError> {
        let entry = SearchIndexEntry::from(listing);
        tokio::time::timeout(self.timeout, self.index.save_object(&entry))
            .await
            .map_err(|_| MirrorError::Timeout(self.timeout))??;
        Ok(())
    }

    /// Removing an object the index does not hold counts as success.
    pub async fn remove(&self, listing_id: Uuid) -> Result<(), MirrorError> {
        let object_id = listing_id.to_string();
        match tokio::time::timeout(self.timeout, self.index.delete_object(&object_id))
            .await
            .map_err(|_| MirrorError::Timeout(self.timeout))?
        {
            Ok(()) | Err(SearchIndexError::NotFound) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Push every stored listing to the index with at most `concurrency`
    /// writes in flight.
    pub async fn reindex_all(
        &self,
        listings: &dyn ListingsRepo,
        concurrency: usize,
    ) -> Result<ReindexReport, RepoError> {
        let concurrency = concurrency.max(1);
        let mut report = ReindexReport::default();
        let mut after = None;

        loop {
            let page = listings.list_after(after, REINDEX_PAGE_SIZE).await?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.id);

            let outcomes: Vec<bool> = futures::stream::iter(page.iter())
                .map(|listing| async move {
                    match self.upsert(listing).await {
                        Ok(()) => true,
                        Err(err) => {
                            record_failure("reindex", listing.id, &err);
                            false
                        }
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

            let indexed = outcomes.iter().filter(|ok| **ok).count();
            report.indexed += indexed;
            report.failed += outcomes.len() - indexed;

            if page.len() < REINDEX_PAGE_SIZE as usize {
                break;
            }
        }

        info!(
            target: TARGET,
            indexed = report.indexed,
            failed = report.failed,
            "Reindex finished"
        );
        Ok(report)
    }
}

/// Log and count a mirror failure. The triggering write stays committed.
pub fn record_failure(operation: &'static str, listing_id: Uuid, err: &MirrorError) {
    counter!(METRIC_FAILURE, "operation" => operation).increment(1);
    warn!(
        target: TARGET,
        operation,
        listing_id = %listing_id,
        error = %err,
        "MirrorWriteFailure: search index out of sync"
    );
}
