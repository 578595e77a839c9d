use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::analytics::ClickRecord;
use crate::models::LinkRecord;
use crate::storage::{LinkEntry, LinkStore, StorageError, StorageResult};

/// Process-memory link store.
///
/// Each shortcode maps to one `LinkEntry`, so creating and purging a link
/// touches a single map slot. DashMap shard locks serialize writers per
/// shortcode; readers clone under the shard read lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, LinkEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn get(&self, shortcode: &str) -> StorageResult<Option<LinkEntry>> {
        Ok(self.entries.get(shortcode).map(|entry| entry.value().clone()))
    }

    async fn get_link(&self, shortcode: &str) -> StorageResult<Option<LinkRecord>> {
        Ok(self.entries.get(shortcode).map(|entry| entry.link.clone()))
    }

    async fn contains(&self, shortcode: &str) -> StorageResult<bool> {
        Ok(self.entries.contains_key(shortcode))
    }

    async fn insert_if_absent(&self, entry: LinkEntry) -> StorageResult<()> {
        match self.entries.entry(entry.link.shortcode.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    async fn append_click(&self, shortcode: &str, click: ClickRecord) -> StorageResult<bool> {
        match self.entries.get_mut(shortcode) {
            Some(mut entry) => {
                entry.analytics.record(click);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, shortcode: &str) -> StorageResult<bool> {
        Ok(self.entries.remove(shortcode).is_some())
    }

    async fn remove_if_expired(&self, shortcode: &str, now: DateTime<Utc>) -> StorageResult<bool> {
        Ok(self
            .entries
            .remove_if(shortcode, |_, entry| entry.link.is_expired_at(now))
            .is_some())
    }

    async fn scan(&self) -> StorageResult<Vec<LinkRecord>> {
        Ok(self
            .entries
            .iter()
            .map(|entry| entry.link.clone())
            .collect())
    }
}
