//! Incremental feed-to-store synchronization.
//!
//! A pass walks the feed newest first, page by page, inserting every record
//! it does not know yet and stopping at the first one it does. Stopping there
//! is only correct while the feed honors its newest-first contract, so each
//! record is also run through a [`RecencyGuard`] and violations are reported.

use std::num::NonZeroU32;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::feed::{FeedSource, FetchError, RecencyGuard};
use crate::storage::{DatabaseError, NewsStore};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to fetch page {page}: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: FetchError,
    },

    #[error("Failed to store {external_id}: {source}")]
    Store {
        external_id: String,
        #[source]
        source: DatabaseError,
    },
}

/// Why a pass ended successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The feed returned a page with no records.
    EmptyPage,
    /// A record already in the store was reached.
    KnownHit { external_id: String },
    /// A page held fewer records than requested: end of feed.
    ShortPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub pages_fetched: u32,
    pub stop: StopReason,
    /// Records that were newer than an earlier record in the same pass.
    pub order_violations: usize,
}

pub struct SyncEngine<F, S> {
    source: F,
    store: S,
    // Held for the whole pass so two passes on one engine never interleave.
    pass_lock: Mutex<()>,
}

impl<F: FeedSource, S: NewsStore> SyncEngine<F, S> {
    pub fn new(source: F, store: S) -> Self {
        Self {
            source,
            store,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one pass.
    ///
    /// Pages and records are processed strictly in feed order. Any fetch or
    /// store error aborts the pass; records inserted before the error stay
    /// committed and the next pass resumes from them.
    pub async fn sync_until_known(&self, page_size: NonZeroU32) -> Result<SyncReport, SyncError> {
        let _guard = self.pass_lock.lock().await;

        let mut order = RecencyGuard::default();
        let mut inserted = 0;
        let mut order_violations = 0;
        let mut page = 0u32;

        let stop = loop {
            let fetched = self
                .source
                .fetch_page(page, page_size)
                .await
                .map_err(|source| SyncError::Fetch { page, source })?;

            if fetched.records.is_empty() {
                break StopReason::EmptyPage;
            }

            let mut known = None;
            for record in &fetched.records {
                if let Some(violation) = order.observe(record) {
                    tracing::warn!(page = page, %violation, "Feed is not sorted newest first");
                    order_violations += 1;
                }

                let exists = self.store.exists(&record.external_id).await.map_err(|source| {
                    SyncError::Store {
                        external_id: record.external_id.clone(),
                        source,
                    }
                })?;
                if exists {
                    known = Some(record.external_id.clone());
                    break;
                }

                let id = self.store.insert_or_fetch(record).await.map_err(|source| {
                    SyncError::Store {
                        external_id: record.external_id.clone(),
                        source,
                    }
                })?;
                inserted += 1;
                tracing::info!(
                    id = id,
                    external_id = %record.external_id,
                    title = %record.title,
                    tags = record.tags.len(),
                    "Inserted news"
                );
            }

            if let Some(external_id) = known {
                break StopReason::KnownHit { external_id };
            }
            if fetched.records.len() < page_size.get() as usize {
                break StopReason::ShortPage;
            }
            page += 1;
        };

        let report = SyncReport {
            inserted,
            pages_fetched: page + 1,
            stop,
            order_violations,
        };
        tracing::info!(
            inserted = report.inserted,
            pages = report.pages_fetched,
            stop = ?report.stop,
            order_violations = report.order_violations,
            "Sync pass finished"
        );
        Ok(report)
    }
}
