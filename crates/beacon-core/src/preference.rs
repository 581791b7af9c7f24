//! Per-recipient notification preferences.

use crate::error::{CoreError, Result};
use crate::notification::{Channel, NotificationType};
use crate::priority::Priority;
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-channel toggles, serialized flat (`slack_enabled`, `email_enabled`, ...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ChannelToggles {
    #[serde(default = "enabled")]
    pub slack_enabled: bool,
    #[serde(default = "enabled")]
    pub email_enabled: bool,
    #[serde(default)]
    pub sms_enabled: bool,
    #[serde(default = "enabled")]
    pub webhook_enabled: bool,
    #[serde(default = "enabled")]
    pub in_app_enabled: bool,
}

const fn enabled() -> bool {
    true
}

impl Default for ChannelToggles {
    fn default() -> Self {
        Self {
            slack_enabled: true,
            email_enabled: true,
            sms_enabled: false,
            webhook_enabled: true,
            in_app_enabled: true,
        }
    }
}

impl ChannelToggles {
    #[must_use]
    pub const fn is_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Slack => self.slack_enabled,
            Channel::Email => self.email_enabled,
            Channel::Sms => self.sms_enabled,
            Channel::Webhook => self.webhook_enabled,
            Channel::InApp => self.in_app_enabled,
        }
    }

    pub fn set(&mut self, channel: Channel, on: bool) {
        match channel {
            Channel::Slack => self.slack_enabled = on,
            Channel::Email => self.email_enabled = on,
            Channel::Sms => self.sms_enabled = on,
            Channel::Webhook => self.webhook_enabled = on,
            Channel::InApp => self.in_app_enabled = on,
        }
    }
}

/// Daily quiet window in the recipient's timezone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuietHours {
    #[serde(default)]
    pub enabled: bool,
    /// Window start, `HH:MM`.
    #[serde(default = "default_start")]
    pub start: String,
    /// Window end, `HH:MM`; may be earlier than `start` for overnight windows.
    #[serde(default = "default_end")]
    pub end: String,
    /// `UTC` or a fixed offset such as `+02:00`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_start() -> String {
    "22:00".to_string()
}

fn default_end() -> String {
    "07:00".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: default_start(),
            end: default_end(),
            timezone: default_timezone(),
        }
    }
}

fn parse_clock(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| CoreError::Validation(format!("invalid time of day: {value}")))
}

/// Parse `UTC`/`Z` or a `±HH:MM` offset.
///
/// # Errors
/// Returns `CoreError::InvalidTimezone` for anything else.
pub fn parse_offset(timezone: &str) -> Result<FixedOffset> {
    let tz = timezone.trim();
    if tz.is_empty() || tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| CoreError::InvalidTimezone(tz.to_string()));
    }

    let invalid = || CoreError::InvalidTimezone(tz.to_string());
    let (sign, rest) = match tz.as_bytes().first() {
        Some(b'+') => (1, &tz[1..]),
        Some(b'-') => (-1, &tz[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

impl QuietHours {
    /// Whether `now` falls inside the quiet window.
    ///
    /// # Errors
    /// Returns an error if the window or timezone cannot be parsed.
    pub fn contains(&self, now: DateTime<Utc>) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }
        let start = parse_clock(&self.start)?;
        let end = parse_clock(&self.end)?;
        let local = now.with_timezone(&parse_offset(&self.timezone)?).time();

        Ok(if start <= end {
            local >= start && local < end
        } else {
            local >= start || local < end
        })
    }

    /// Validate the window without evaluating it.
    ///
    /// # Errors
    /// Returns an error if the window or timezone cannot be parsed.
    pub fn validate(&self) -> Result<()> {
        parse_clock(&self.start)?;
        parse_clock(&self.end)?;
        parse_offset(&self.timezone)?;
        Ok(())
    }
}

/// A recipient's notification preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipientPreference {
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default)]
    pub channels: ChannelToggles,

    /// Per-type toggles; a type that is not listed counts as enabled.
    #[serde(default)]
    pub types: HashMap<NotificationType, bool>,

    /// Requests below this priority are not delivered to the recipient.
    #[serde(default = "default_threshold")]
    pub priority_threshold: Priority,

    #[serde(default)]
    pub quiet_hours: QuietHours,
}

const fn default_threshold() -> Priority {
    Priority::Low
}

impl RecipientPreference {
    /// Default preferences for a user with nothing stored.
    #[must_use]
    pub fn default_for(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            phone: None,
            channels: ChannelToggles::default(),
            types: HashMap::new(),
            priority_threshold: Priority::Low,
            quiet_hours: QuietHours::default(),
        }
    }

    #[must_use]
    pub fn with_channel(mut self, channel: Channel, on: bool) -> Self {
        self.channels.set(channel, on);
        self
    }

    #[must_use]
    pub fn with_type(mut self, notification_type: NotificationType, on: bool) -> Self {
        self.types.insert(notification_type, on);
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub const fn channel_enabled(&self, channel: Channel) -> bool {
        self.channels.is_enabled(channel)
    }

    #[must_use]
    pub fn type_enabled(&self, notification_type: NotificationType) -> bool {
        self.types.get(&notification_type).copied().unwrap_or(true)
    }

    /// Validate user-supplied fields.
    ///
    /// # Errors
    /// Returns an error for an empty user id or an unparseable quiet window.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(CoreError::Validation("user_id is required".to_string()));
        }
        self.quiet_hours.validate()
    }
}
