//! In-app feed adapter.

use crate::channel::{ChannelAdapter, Recipient};
use crate::error::Result;
use async_trait::async_trait;
use beacon_core::{Channel, DeliveryResult, FeedEntry, NotificationRequest};
use beacon_store::FeedStore;
use std::sync::Arc;

/// Writes one feed entry per recipient.
#[derive(Clone)]
pub struct InAppAdapter {
    feed: Arc<dyn FeedStore>,
}

impl InAppAdapter {
    #[must_use]
    pub fn new(feed: Arc<dyn FeedStore>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl ChannelAdapter for InAppAdapter {
    fn channel(&self) -> Channel {
        Channel::InApp
    }

    async fn send(
        &self,
        request: &NotificationRequest,
        recipients: &[Recipient],
    ) -> Result<DeliveryResult> {
        for recipient in recipients {
            self.feed
                .push_feed(&FeedEntry::new(&recipient.user_id, request))
                .await?;
        }
        Ok(DeliveryResult::delivered(Channel::InApp, recipients.len()))
    }
}
