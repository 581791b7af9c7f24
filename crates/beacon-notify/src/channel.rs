//! The channel adapter contract.

use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use beacon_core::{Channel, DeliveryResult, NotificationRequest, RecipientPreference};
use reqwest::Response;
use serde::{Deserialize, Serialize};

/// An eligible recipient with the contact details adapters need.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Recipient {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            phone: None,
        }
    }
}

impl From<&RecipientPreference> for Recipient {
    fn from(preference: &RecipientPreference) -> Self {
        Self {
            user_id: preference.user_id.clone(),
            email: preference.email.clone(),
            phone: preference.phone.clone(),
        }
    }
}

/// Delivers a rendered notification over one channel.
///
/// Implementations receive only recipients already judged eligible. An
/// unconfigured adapter reports a simulated success (`mock: true`); any
/// other failure is returned as an error and recorded per channel by the
/// router.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(
        &self,
        request: &NotificationRequest,
        recipients: &[Recipient],
    ) -> Result<DeliveryResult>;
}

/// Map a non-2xx provider response to an error.
pub(crate) fn check_status(channel: Channel, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(NotifyError::Status {
            channel,
            status: status.as_u16(),
        })
    }
}
