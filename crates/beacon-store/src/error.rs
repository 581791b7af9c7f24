//! Error types for the persistence layer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store not initialized at the specified path.
    #[error("store not found at '{0}'")]
    StoreNotFound(PathBuf),

    /// Store already initialized.
    #[error("store already exists at '{0}'")]
    StoreExists(PathBuf),

    /// A record already exists for this source key (unique constraint).
    #[error("record already exists for source key: {0}")]
    Conflict(String),

    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Domain validation error.
    #[error("core error: {0}")]
    Core(#[from] beacon_core::CoreError),
}

impl StoreError {
    /// Whether this error means "the store could not answer" rather than a
    /// problem with the request itself.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Io(_) | Self::StoreNotFound(_)
        )
    }
}
