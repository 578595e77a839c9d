use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::analytics::{AnalyticsRecord, ClickRecord};
use crate::models::LinkRecord;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Both facets of a short link. Stored, replaced and removed as one value.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEntry {
    pub link: LinkRecord,
    pub analytics: AnalyticsRecord,
}

impl LinkEntry {
    /// Fresh entry with empty analytics
    pub fn new(link: LinkRecord) -> Self {
        Self {
            link,
            analytics: AnalyticsRecord::new(),
        }
    }
}

/// Keyed store for link entries.
///
/// Every method is atomic per shortcode: an implementation must never let a
/// reader observe a link without its analytics, or a click count that
/// disagrees with the click history.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Full entry (link and analytics) for a shortcode
    async fn get(&self, shortcode: &str) -> StorageResult<Option<LinkEntry>>;

    /// Link facet only, without copying the click history
    async fn get_link(&self, shortcode: &str) -> StorageResult<Option<LinkRecord>>;

    async fn contains(&self, shortcode: &str) -> StorageResult<bool>;

    /// Insert the entry unless its shortcode is taken, in which case
    /// `StorageError::Conflict` is returned and nothing changes
    async fn insert_if_absent(&self, entry: LinkEntry) -> StorageResult<()>;

    /// Append a click to the entry's analytics. Returns false if the
    /// shortcode is absent.
    async fn append_click(&self, shortcode: &str, click: ClickRecord) -> StorageResult<bool>;

    /// Remove the entry. Returns false if it was absent.
    async fn remove(&self, shortcode: &str) -> StorageResult<bool>;

    /// Remove the entry only if its link is expired at `now`, checked under
    /// the same lock as the removal. Returns false if nothing was removed.
    async fn remove_if_expired(&self, shortcode: &str, now: DateTime<Utc>) -> StorageResult<bool>;

    /// Snapshot of every stored link facet
    async fn scan(&self) -> StorageResult<Vec<LinkRecord>>;
}
