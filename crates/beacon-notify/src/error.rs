//! Error types for notification dispatch.

use beacon_core::{Channel, CoreError};
use beacon_store::StoreError;
use thiserror::Error;

/// Result type alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that can occur while dispatching notifications.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The request itself is malformed.
    #[error("invalid notification request: {0}")]
    Invalid(#[from] CoreError),

    /// Recipient preferences could not be loaded; nothing can be dispatched.
    #[error("recipient preferences unavailable: {0}")]
    PreferencesUnavailable(#[source] StoreError),

    /// A provider answered with a non-success status.
    #[error("{channel} provider returned HTTP {status}")]
    Status { channel: Channel, status: u16 },

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing to a backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
