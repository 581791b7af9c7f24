//! Error types for the ingestion pipeline.

use beacon_store::StoreError;
use thiserror::Error;

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that can occur while turning an event into a record.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The event lacks data needed to build a record.
    #[error("cannot build record: {0}")]
    Build(String),

    /// Every category strategy failed.
    #[error("no category strategy succeeded: {0}")]
    Category(String),

    /// The classification service returned something unusable.
    #[error("ai classification failed: {0}")]
    Ai(String),

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
