//! SMS gateway adapter.

use crate::channel::{ChannelAdapter, Recipient, check_status};
use crate::config::{SmsConfig, configured};
use crate::error::Result;
use crate::render;
use async_trait::async_trait;
use beacon_core::{Channel, DeliveryResult, NotificationRequest};
use futures::future::join_all;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

/// Sends one text message per recipient with a phone number, concurrently.
#[derive(Debug, Clone)]
pub struct SmsAdapter {
    client: Client,
    config: SmsConfig,
}

impl SmsAdapter {
    #[must_use]
    pub fn new(client: Client, config: &SmsConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    async fn send_one(&self, url: &str, key: Option<&str>, to: &str, body: &str) -> Result<()> {
        let mut builder = self
            .client
            .post(url)
            .json(&json!({ "from": self.config.from, "to": to, "body": body }));
        if let Some(key) = key {
            builder = builder.bearer_auth(key);
        }
        check_status(Channel::Sms, builder.send().await?)?;
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for SmsAdapter {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send(
        &self,
        request: &NotificationRequest,
        recipients: &[Recipient],
    ) -> Result<DeliveryResult> {
        let phones: Vec<&str> = recipients
            .iter()
            .filter_map(|r| r.phone.as_deref())
            .filter(|p| !p.trim().is_empty())
            .collect();

        let Some(url) = configured(self.config.gateway_url.as_deref()) else {
            debug!("SMS gateway not configured, simulating delivery");
            return Ok(DeliveryResult::simulated(Channel::Sms, phones.len()));
        };
        let key = configured(self.config.api_key.as_deref());

        if phones.is_empty() {
            return Ok(DeliveryResult::delivered(Channel::Sms, 0)
                .with_detail("no recipients with a phone number"));
        }

        let body = render::sms_text(request);
        let sends = phones
            .iter()
            .map(|phone| self.send_one(url, key, phone, &body));

        let mut reached = 0;
        let mut last_error = None;
        for outcome in join_all(sends).await {
            match outcome {
                Ok(()) => reached += 1,
                Err(e) => {
                    warn!(error = %e, "SMS send failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if reached == 0 => Err(e),
            Some(_) => Ok(DeliveryResult::delivered(Channel::Sms, reached).with_detail(format!(
                "{} of {} messages failed",
                phones.len() - reached,
                phones.len()
            ))),
            None => Ok(DeliveryResult::delivered(Channel::Sms, reached)),
        }
    }
}
