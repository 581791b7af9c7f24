//! Chat incoming-webhook adapter.

use crate::channel::{ChannelAdapter, Recipient, check_status};
use crate::config::{SlackConfig, configured};
use crate::error::Result;
use crate::render;
use async_trait::async_trait;
use beacon_core::{Channel, DeliveryResult, NotificationRequest};
use reqwest::Client;
use serde_json::json;
use tracing::debug;

/// Posts `{ "text": ... }` to a chat incoming-webhook URL.
#[derive(Debug, Clone)]
pub struct SlackAdapter {
    client: Client,
    webhook_url: Option<String>,
}

impl SlackAdapter {
    #[must_use]
    pub fn new(client: Client, config: &SlackConfig) -> Self {
        Self {
            client,
            webhook_url: config.webhook_url.clone(),
        }
    }
}

#[async_trait]
impl ChannelAdapter for SlackAdapter {
    fn channel(&self) -> Channel {
        Channel::Slack
    }

    async fn send(
        &self,
        request: &NotificationRequest,
        recipients: &[Recipient],
    ) -> Result<DeliveryResult> {
        let Some(url) = configured(self.webhook_url.as_deref()) else {
            debug!("Slack webhook not configured, simulating delivery");
            return Ok(DeliveryResult::simulated(Channel::Slack, recipients.len()));
        };

        let response = self
            .client
            .post(url)
            .json(&json!({ "text": render::slack_text(request) }))
            .send()
            .await?;
        check_status(Channel::Slack, response)?;

        debug!(recipients = recipients.len(), "Posted to Slack");
        Ok(DeliveryResult::delivered(Channel::Slack, recipients.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::testing::spawn_endpoint;
    use crate::error::NotifyError;
    use axum::http::StatusCode;
    use beacon_core::{NotificationMessage, NotificationType, Priority};

    fn request() -> NotificationRequest {
        NotificationRequest::new(
            NotificationType::ApprovalRequest,
            Priority::High,
            ["u1", "u2"],
            NotificationMessage::new("Review ABC-1", "New record pending"),
        )
    }

    fn adapter(url: Option<&str>) -> SlackAdapter {
        SlackAdapter::new(
            Client::new(),
            &SlackConfig {
                webhook_url: url.map(ToString::to_string),
            },
        )
    }

    #[tokio::test]
    async fn test_unconfigured_is_simulated() {
        for url in [None, Some(""), Some("undefined")] {
            let result = adapter(url)
                .send(&request(), &[Recipient::new("u1")])
                .await
                .unwrap();
            assert!(result.success);
            assert!(result.mock);
            assert_eq!(result.recipients_reached, 1);
        }
    }

    #[tokio::test]
    async fn test_posts_rendered_text() {
        let (url, capture) = spawn_endpoint(StatusCode::OK).await;

        let recipients = [Recipient::new("u1"), Recipient::new("u2")];
        let result = adapter(Some(&url)).send(&request(), &recipients).await.unwrap();

        assert!(result.success);
        assert!(!result.mock);
        assert_eq!(result.recipients_reached, 2);

        let captured = capture.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].body["text"], "*[HIGH] Review ABC-1*\nNew record pending");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let (url, _capture) = spawn_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;

        let err = adapter(Some(&url))
            .send(&request(), &[Recipient::new("u1")])
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Status { status: 500, .. }));
    }
}
