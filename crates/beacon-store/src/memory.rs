//! In-memory store for tests and ephemeral deployments.

use crate::error::{Result, StoreError};
use crate::store::{DeliveryLog, FeedStore, PreferenceStore, RecordStore};
use async_trait::async_trait;
use beacon_core::{DeliveryLogEntry, DerivedRecord, FeedEntry, RecipientPreference};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, DerivedRecord>,
    preferences: HashMap<String, RecipientPreference>,
    deliveries: Vec<DeliveryLogEntry>,
    feed: Vec<FeedEntry>,
}

/// A store held entirely in memory.
///
/// `set_unavailable(true)` makes every call fail with
/// `StoreError::Unavailable`, simulating an outage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_by_source_key(&self, source_key: &str) -> Result<Option<DerivedRecord>> {
        Ok(self.lock()?.records.get(source_key).cloned())
    }

    async fn insert_record(&self, record: &DerivedRecord) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.records.contains_key(&record.source_key) {
            return Err(StoreError::Conflict(record.source_key.clone()));
        }
        inner
            .records
            .insert(record.source_key.clone(), record.clone());
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<DerivedRecord>> {
        let mut records: Vec<_> = self.lock()?.records.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_preference(&self, user_id: &str) -> Result<Option<RecipientPreference>> {
        Ok(self.lock()?.preferences.get(user_id).cloned())
    }

    async fn put_preference(&self, preference: &RecipientPreference) -> Result<()> {
        preference.validate()?;
        self.lock()?
            .preferences
            .insert(preference.user_id.clone(), preference.clone());
        Ok(())
    }
}

#[async_trait]
impl DeliveryLog for MemoryStore {
    async fn append_delivery(&self, entry: &DeliveryLogEntry) -> Result<()> {
        self.lock()?.deliveries.push(entry.clone());
        Ok(())
    }

    async fn recent_deliveries(&self, limit: usize) -> Result<Vec<DeliveryLogEntry>> {
        Ok(self
            .lock()?
            .deliveries
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn push_feed(&self, entry: &FeedEntry) -> Result<()> {
        self.lock()?.feed.push(entry.clone());
        Ok(())
    }

    async fn feed_for(&self, user_id: &str) -> Result<Vec<FeedEntry>> {
        Ok(self
            .lock()?
            .feed
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::Category;

    #[tokio::test]
    async fn test_conflict_on_duplicate_key() {
        let store = MemoryStore::new();
        store
            .insert_record(&DerivedRecord::new("ABC-1", Category::Added))
            .await
            .unwrap();

        let err = store
            .insert_record(&DerivedRecord::new("ABC-1", Category::Added))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);

        let err = store.find_by_source_key("ABC-1").await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.get_preference("u1").await.is_err());

        store.set_unavailable(false);
        assert!(store.find_by_source_key("ABC-1").await.unwrap().is_none());
    }
}
