//! Store configuration.

use serde::{Deserialize, Serialize};

/// Store metadata kept in `.beacon/store.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Layout version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Human-readable store name.
    #[serde(default)]
    pub name: Option<String>,
}

fn default_version() -> u32 {
    1
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
        }
    }
}

impl StoreConfig {
    /// Create a config with the given store name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}
