//! Service configuration (`beacon.yml`).
//!
//! Every field has a default, so an empty or missing file yields a working
//! (fully simulated) deployment.

use anyhow::{Context, Result};
use beacon_ingest::{AiConfig, IngestConfig};
use beacon_notify::{ChannelConfig, RoutingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which store backs the service.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Fs,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Data directory for the filesystem backend.
    #[serde(default = "default_data_dir")]
    pub path: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("beacon-data")
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_data_dir(),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeaconConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl BeaconConfig {
    /// Load configuration from a YAML file; a missing file yields defaults.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;

        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Override secrets from an environment-style lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.channels.apply_overrides(&lookup);
        self.ai.apply_overrides(&lookup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = BeaconConfig::load(&tmp.path().join("beacon.yml")).unwrap();
        assert_eq!(config, BeaconConfig::default());
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_load_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("beacon.yml");
        std::fs::write(
            &path,
            "server:\n  port: 8080\nstore:\n  backend: memory\ningest:\n  reviewers: [lead]\n",
        )
        .unwrap();

        let config = BeaconConfig::load(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.ingest.reviewers, vec!["lead".to_string()]);
        assert_eq!(config.routing.channel_timeout_ms, 5_000);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("beacon.yml");
        std::fs::write(&path, "server: [not, a, map]").unwrap();
        assert!(BeaconConfig::load(&path).is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("BEACON_AI_API_KEY", "sk-test"),
            ("BEACON_WEBHOOK_URL", "https://example.com/hook"),
        ]
        .into_iter()
        .collect();

        let mut config = BeaconConfig::default();
        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.channels.webhook.url.as_deref(), Some("https://example.com/hook"));
    }
}
