//! Error types for beacon-core.

use thiserror::Error;

/// Result type alias for beacon-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in beacon-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Webhook body could not be decoded into a known payload shape.
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),

    /// Unknown priority name.
    #[error("unknown priority: {0}")]
    UnknownPriority(String),

    /// Unknown record category.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Unknown delivery channel.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// Timezone string is neither `UTC` nor a `±HH:MM` offset.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),
}
