//! Channel and routing configuration.
//!
//! Loaded as part of `beacon.yml`; secrets may be overridden from the
//! environment through [`ChannelConfig::apply_overrides`].

use crate::router::{DispatchPolicy, QuietHoursPolicy};
use beacon_core::{Route, RouteTable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Return the value only if it names a real endpoint or key.
///
/// Missing values, empty strings and the literal `undefined` all count as
/// unconfigured.
#[must_use]
pub fn configured(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "undefined")
}

/// Chat incoming-webhook settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlackConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// Transactional email provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_email_from")]
    pub from: String,
}

fn default_email_from() -> String {
    "beacon@localhost".to_string()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            from: default_email_from(),
        }
    }
}

/// SMS gateway settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub from: String,
}

/// Generic outbound webhook settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundWebhookConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// All channel settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelConfig {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub webhook: OutboundWebhookConfig,
    /// Timeout for each outbound provider request; keep it below
    /// `routing.channel_timeout_ms` so a slow call fails on its own.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

const fn default_request_timeout_ms() -> u64 {
    4_000
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig::default(),
            email: EmailConfig::default(),
            sms: SmsConfig::default(),
            webhook: OutboundWebhookConfig::default(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ChannelConfig {
    /// Override secrets from an environment-style lookup.
    ///
    /// Only keys the lookup returns are replaced.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("BEACON_SLACK_WEBHOOK_URL") {
            self.slack.webhook_url = Some(url);
        }
        if let Some(key) = lookup("BEACON_EMAIL_API_KEY") {
            self.email.api_key = Some(key);
        }
        if let Some(key) = lookup("BEACON_SMS_API_KEY") {
            self.sms.api_key = Some(key);
        }
        if let Some(url) = lookup("BEACON_WEBHOOK_URL") {
            self.webhook.url = Some(url);
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Router settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingConfig {
    #[serde(default = "default_channel_timeout_ms")]
    pub channel_timeout_ms: u64,
    #[serde(default)]
    pub quiet_hours: QuietHoursPolicy,
    /// Replaces the built-in route table when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<Route>>,
}

const fn default_channel_timeout_ms() -> u64 {
    5_000
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            channel_timeout_ms: default_channel_timeout_ms(),
            quiet_hours: QuietHoursPolicy::default(),
            routes: None,
        }
    }
}

impl RoutingConfig {
    #[must_use]
    pub fn route_table(&self) -> RouteTable {
        self.routes
            .clone()
            .map_or_else(RouteTable::default, RouteTable::new)
    }

    #[must_use]
    pub const fn policy(&self) -> DispatchPolicy {
        DispatchPolicy {
            channel_timeout: Duration::from_millis(self.channel_timeout_ms),
            quiet_hours: self.quiet_hours,
        }
    }
}
