//! Persistence interfaces used by the pipeline and the router.
//!
//! The hosted document store is an external collaborator; these traits are
//! the whole surface beacon relies on.

use crate::error::Result;
use async_trait::async_trait;
use beacon_core::{DeliveryLogEntry, DerivedRecord, FeedEntry, RecipientPreference};

/// Derived changelog records, unique per source key.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the record derived from an issue key.
    async fn find_by_source_key(&self, source_key: &str) -> Result<Option<DerivedRecord>>;

    /// Insert a new record.
    ///
    /// This is the authoritative uniqueness check: implementations must fail
    /// with `StoreError::Conflict` if a record for the same source key exists,
    /// even when two inserts race.
    async fn insert_record(&self, record: &DerivedRecord) -> Result<()>;

    /// All records, newest first.
    async fn list_records(&self) -> Result<Vec<DerivedRecord>>;
}

/// Recipient preferences keyed by user id.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_preference(&self, user_id: &str) -> Result<Option<RecipientPreference>>;

    async fn put_preference(&self, preference: &RecipientPreference) -> Result<()>;
}

/// Append-only log of notification dispatches.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    async fn append_delivery(&self, entry: &DeliveryLogEntry) -> Result<()>;

    /// Most recent entries, newest first.
    async fn recent_deliveries(&self, limit: usize) -> Result<Vec<DeliveryLogEntry>>;
}

/// Per-user in-app notification feed.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn push_feed(&self, entry: &FeedEntry) -> Result<()>;

    /// A user's feed, newest first.
    async fn feed_for(&self, user_id: &str) -> Result<Vec<FeedEntry>>;
}

/// Everything a beacon deployment persists.
pub trait Store: RecordStore + PreferenceStore + DeliveryLog + FeedStore {}

impl<T> Store for T where T: RecordStore + PreferenceStore + DeliveryLog + FeedStore {}
