//! Notification requests, delivery results and the records they leave behind.

use crate::error::{CoreError, Result};
use crate::priority::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of notification being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ApprovalRequest,
    ChangelogQueued,
    ChangelogPublished,
    SystemAlert,
    Digest,
}

impl NotificationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApprovalRequest => "approval_request",
            Self::ChangelogQueued => "changelog_queued",
            Self::ChangelogPublished => "changelog_published",
            Self::SystemAlert => "system_alert",
            Self::Digest => "digest",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Chat tool incoming webhook.
    Slack,
    Email,
    Sms,
    /// Generic outbound webhook.
    Webhook,
    /// In-app notification feed.
    InApp,
}

impl Channel {
    pub const ALL: [Self; 5] = [Self::Slack, Self::Email, Self::Sms, Self::Webhook, Self::InApp];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Webhook => "webhook",
            Self::InApp => "in_app",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownChannel(s.to_string()))
    }
}

/// Message content shared by every channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub data: Value,
}

impl NotificationMessage {
    #[must_use]
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            data: Value::Null,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// A request to notify a set of users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub priority: Priority,
    pub recipients: Vec<String>,
    /// Explicit channel list; replaces route selection when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<Channel>>,
    pub message: NotificationMessage,
}

impl NotificationRequest {
    #[must_use]
    pub fn new(
        notification_type: NotificationType,
        priority: Priority,
        recipients: impl IntoIterator<Item = impl Into<String>>,
        message: NotificationMessage,
    ) -> Self {
        Self {
            notification_type,
            priority,
            recipients: recipients.into_iter().map(Into::into).collect(),
            channels: None,
            message,
        }
    }

    #[must_use]
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = Channel>) -> Self {
        self.channels = Some(channels.into_iter().collect());
        self
    }

    /// Validate the request shape.
    ///
    /// # Errors
    /// Returns `CoreError::Validation` when there are no usable recipients or
    /// the subject is empty.
    pub fn validate(&self) -> Result<()> {
        if self.recipients.iter().all(|r| r.trim().is_empty()) {
            return Err(CoreError::Validation("at least one recipient is required".to_string()));
        }
        if self.message.subject.trim().is_empty() {
            return Err(CoreError::Validation("message subject is required".to_string()));
        }
        Ok(())
    }
}

/// Outcome of one channel's delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryResult {
    pub channel: Channel,
    pub recipients_reached: usize,
    pub success: bool,
    /// True when the channel is unconfigured and delivery was simulated.
    #[serde(default)]
    pub mock: bool,
    #[serde(default)]
    pub detail: String,
}

impl DeliveryResult {
    #[must_use]
    pub fn delivered(channel: Channel, recipients_reached: usize) -> Self {
        Self {
            channel,
            recipients_reached,
            success: true,
            mock: false,
            detail: "delivered".to_string(),
        }
    }

    #[must_use]
    pub fn simulated(channel: Channel, recipients_reached: usize) -> Self {
        Self {
            channel,
            recipients_reached,
            success: true,
            mock: true,
            detail: "channel not configured; delivery simulated".to_string(),
        }
    }

    #[must_use]
    pub fn skipped(channel: Channel) -> Self {
        Self {
            channel,
            recipients_reached: 0,
            success: true,
            mock: false,
            detail: "no eligible recipients".to_string(),
        }
    }

    #[must_use]
    pub fn failed(channel: Channel, detail: impl Into<String>) -> Self {
        Self {
            channel,
            recipients_reached: 0,
            success: false,
            mock: false,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Aggregated outcome of a notification dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchReport {
    /// True only if every invoked channel succeeded.
    pub success: bool,
    pub channels_used: Vec<Channel>,
    pub recipients_reached: usize,
    pub results: Vec<DeliveryResult>,
}

impl DispatchReport {
    /// Aggregate per-channel results. Channels skipped for lack of eligible
    /// recipients are reported but not counted as used.
    #[must_use]
    pub fn from_results(results: Vec<DeliveryResult>) -> Self {
        let channels_used = results
            .iter()
            .filter(|r| r.success && r.recipients_reached > 0)
            .map(|r| r.channel)
            .collect();
        Self {
            success: results.iter().all(|r| r.success),
            channels_used,
            recipients_reached: results.iter().map(|r| r.recipients_reached).sum(),
            results,
        }
    }

    #[must_use]
    pub fn result_for(&self, channel: Channel) -> Option<&DeliveryResult> {
        self.results.iter().find(|r| r.channel == channel)
    }
}

/// Persisted record of one dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryLogEntry {
    pub id: String,
    pub logged_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub subject: String,
    pub recipients: Vec<String>,
    pub success: bool,
    pub results: Vec<DeliveryResult>,
    /// Why the request was rejected before any channel ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryLogEntry {
    #[must_use]
    pub fn new(request: &NotificationRequest, report: &DispatchReport) -> Self {
        Self {
            id: format!("dlv_{}", Uuid::new_v4().as_simple()),
            logged_at: Utc::now(),
            notification_type: request.notification_type,
            priority: request.priority,
            subject: request.message.subject.clone(),
            recipients: request.recipients.clone(),
            success: report.success,
            results: report.results.clone(),
            error: None,
        }
    }

    /// Entry for a request that failed before dispatch.
    #[must_use]
    pub fn rejected(request: &NotificationRequest, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::new(request, &DispatchReport::from_results(Vec::new()))
        }
    }
}

/// One entry in a user's in-app notification feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedEntry {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub data: Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl FeedEntry {
    #[must_use]
    pub fn new(user_id: impl Into<String>, request: &NotificationRequest) -> Self {
        Self {
            id: format!("feed_{}", Uuid::new_v4().as_simple()),
            user_id: user_id.into(),
            notification_type: request.notification_type,
            priority: request.priority,
            subject: request.message.subject.clone(),
            body: request.message.body.clone(),
            data: request.message.data.clone(),
            created_at: Utc::now(),
            read: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_deserialization() {
        let json = json!({
            "type": "approval_request",
            "priority": "urgent",
            "recipients": ["u1"],
            "channels": ["slack", "in_app"],
            "message": {"subject": "Review", "body": "Please review", "data": {"id": 1}}
        });
        let request: NotificationRequest = serde_json::from_value(json).unwrap();

        assert_eq!(request.notification_type, NotificationType::ApprovalRequest);
        assert_eq!(request.priority, Priority::Critical);
        assert_eq!(request.channels, Some(vec![Channel::Slack, Channel::InApp]));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_validation() {
        let message = NotificationMessage::new("Subject", "Body");
        let empty = NotificationRequest::new(
            NotificationType::SystemAlert,
            Priority::Low,
            Vec::<String>::new(),
            message,
        );
        assert!(empty.validate().is_err());

        let no_subject = NotificationRequest::new(
            NotificationType::SystemAlert,
            Priority::Low,
            ["u1"],
            NotificationMessage::new(" ", "Body"),
        );
        assert!(no_subject.validate().is_err());
    }

    #[test]
    fn test_report_aggregation() {
        let report = DispatchReport::from_results(vec![
            DeliveryResult::delivered(Channel::Slack, 2),
            DeliveryResult::skipped(Channel::Webhook),
            DeliveryResult::simulated(Channel::Email, 1),
        ]);
        assert!(report.success);
        assert_eq!(report.channels_used, vec![Channel::Slack, Channel::Email]);
        assert_eq!(report.recipients_reached, 3);

        let failed = DispatchReport::from_results(vec![
            DeliveryResult::delivered(Channel::Slack, 2),
            DeliveryResult::failed(Channel::Sms, "gateway down"),
        ]);
        assert!(!failed.success);
        assert_eq!(failed.channels_used, vec![Channel::Slack]);
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!("In_App".parse::<Channel>().unwrap(), Channel::InApp);
        assert!("pager".parse::<Channel>().is_err());
    }
}
