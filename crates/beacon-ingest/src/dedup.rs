//! Dedup guard: at most one derived record per source key.

use beacon_store::RecordStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Checks whether a source key already produced a record.
///
/// The check fails open: if the store errors or does not answer in time
/// the key is treated as new. The store's unique insert is the second line
/// of defense.
#[derive(Clone)]
pub struct DedupGuard {
    records: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl DedupGuard {
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self { records, timeout }
    }

    pub async fn already_processed(&self, source_key: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.records.find_by_source_key(source_key)).await {
            Ok(Ok(found)) => found.is_some(),
            Ok(Err(e)) => {
                warn!(source_key, error = %e, "Dedup lookup failed, proceeding");
                false
            }
            Err(_) => {
                warn!(
                    source_key,
                    timeout_ms = %self.timeout.as_millis(),
                    "Dedup lookup timed out, proceeding"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use beacon_core::{Category, DerivedRecord};
    use beacon_store::{MemoryStore, Result as StoreResult};

    struct SlowStore;

    #[async_trait]
    impl RecordStore for SlowStore {
        async fn find_by_source_key(&self, _source_key: &str) -> StoreResult<Option<DerivedRecord>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some(DerivedRecord::new("ABC-1", Category::Added)))
        }

        async fn insert_record(&self, _record: &DerivedRecord) -> StoreResult<()> {
            Ok(())
        }

        async fn list_records(&self) -> StoreResult<Vec<DerivedRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_known_key_is_processed() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_record(&DerivedRecord::new("ABC-1", Category::Fixed))
            .await
            .unwrap();
        let guard = DedupGuard::new(store, Duration::from_secs(1));

        assert!(guard.already_processed("ABC-1").await);
        assert!(!guard.already_processed("ABC-2").await);
    }

    #[tokio::test]
    async fn test_store_error_fails_open() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let guard = DedupGuard::new(store, Duration::from_secs(1));

        assert!(!guard.already_processed("ABC-1").await);
    }

    #[tokio::test]
    async fn test_timeout_fails_open() {
        let guard = DedupGuard::new(Arc::new(SlowStore), Duration::from_millis(20));
        assert!(!guard.already_processed("ABC-1").await);
    }
}
