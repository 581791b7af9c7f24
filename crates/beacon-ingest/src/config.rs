//! Ingestion and AI classification settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Messages-API classification settings. Without an API key the AI
/// strategy is left out of the category chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_ai_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

const fn default_ai_timeout_ms() -> u64 {
    5_000
}

const fn default_max_tokens() -> u32 {
    16
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            timeout_ms: default_ai_timeout_ms(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl AiConfig {
    /// Override the API key from an environment-style lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("BEACON_AI_API_KEY") {
            self.api_key = Some(key);
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Bound on the dedup lookup before failing open.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// Users told when a new record is queued for approval.
    #[serde(default)]
    pub reviewers: Vec<String>,
}

const fn default_store_timeout_ms() -> u64 {
    2_000
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout_ms(),
            reviewers: Vec::new(),
        }
    }
}

impl IngestConfig {
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
