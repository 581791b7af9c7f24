//! Generic outbound webhook adapter.

use crate::channel::{ChannelAdapter, Recipient, check_status};
use crate::config::{OutboundWebhookConfig, configured};
use crate::error::Result;
use async_trait::async_trait;
use beacon_core::{Channel, DeliveryResult, NotificationRequest};
use reqwest::Client;
use serde_json::json;
use tracing::debug;

/// Posts a JSON envelope describing the notification to a configured URL.
#[derive(Debug, Clone)]
pub struct WebhookAdapter {
    client: Client,
    url: Option<String>,
}

impl WebhookAdapter {
    #[must_use]
    pub fn new(client: Client, config: &OutboundWebhookConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl ChannelAdapter for WebhookAdapter {
    fn channel(&self) -> Channel {
        Channel::Webhook
    }

    async fn send(
        &self,
        request: &NotificationRequest,
        recipients: &[Recipient],
    ) -> Result<DeliveryResult> {
        let Some(url) = configured(self.url.as_deref()) else {
            debug!("Outbound webhook not configured, simulating delivery");
            return Ok(DeliveryResult::simulated(Channel::Webhook, recipients.len()));
        };

        let envelope = json!({
            "type": request.notification_type,
            "priority": request.priority,
            "subject": request.message.subject,
            "body": request.message.body,
            "data": request.message.data,
            "recipients": recipients.iter().map(|r| r.user_id.as_str()).collect::<Vec<_>>(),
        });

        let response = self.client.post(url).json(&envelope).send().await?;
        check_status(Channel::Webhook, response)?;

        Ok(DeliveryResult::delivered(Channel::Webhook, recipients.len()))
    }
}
