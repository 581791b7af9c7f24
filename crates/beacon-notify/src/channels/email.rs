//! Transactional email adapter.

use crate::channel::{ChannelAdapter, Recipient, check_status};
use crate::config::{EmailConfig, configured};
use crate::error::Result;
use crate::render;
use async_trait::async_trait;
use beacon_core::{Channel, DeliveryResult, NotificationRequest};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: String,
}

/// Sends one email to every recipient with an address, in a single API call.
#[derive(Debug, Clone)]
pub struct EmailAdapter {
    client: Client,
    config: EmailConfig,
}

impl EmailAdapter {
    #[must_use]
    pub fn new(client: Client, config: &EmailConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl ChannelAdapter for EmailAdapter {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(
        &self,
        request: &NotificationRequest,
        recipients: &[Recipient],
    ) -> Result<DeliveryResult> {
        let to: Vec<&str> = recipients
            .iter()
            .filter_map(|r| r.email.as_deref())
            .filter(|e| !e.trim().is_empty())
            .collect();

        let (Some(url), Some(key)) = (
            configured(self.config.api_url.as_deref()),
            configured(self.config.api_key.as_deref()),
        ) else {
            debug!("Email provider not configured, simulating delivery");
            return Ok(DeliveryResult::simulated(Channel::Email, to.len()));
        };

        if to.is_empty() {
            return Ok(DeliveryResult::delivered(Channel::Email, 0)
                .with_detail("no recipients with an email address"));
        }

        let reached = to.len();
        let payload = EmailPayload {
            from: &self.config.from,
            to,
            subject: &request.message.subject,
            text: render::email_text(request),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(key)
            .json(&payload)
            .send()
            .await?;
        check_status(Channel::Email, response)?;

        debug!(recipients = reached, "Sent email");
        Ok(DeliveryResult::delivered(Channel::Email, reached))
    }
}
