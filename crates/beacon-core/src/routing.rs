//! Static route table: (notification type, minimum priority) -> channels.

use crate::notification::{Channel, NotificationType};
use crate::priority::Priority;
use serde::{Deserialize, Serialize};

/// One routing rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub min_priority: Priority,
    pub channels: Vec<Channel>,
}

impl Route {
    #[must_use]
    pub fn new(
        notification_type: NotificationType,
        min_priority: Priority,
        channels: impl IntoIterator<Item = Channel>,
    ) -> Self {
        Self {
            notification_type,
            min_priority,
            channels: channels.into_iter().collect(),
        }
    }

    /// A route fires when the type matches and the request priority is at
    /// least the route's minimum.
    #[must_use]
    pub fn applies_to(&self, notification_type: NotificationType, priority: Priority) -> bool {
        self.notification_type == notification_type && priority.meets(self.min_priority)
    }
}

/// Ordered set of routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub const fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Routes matching a request, in table order.
    pub fn select(
        &self,
        notification_type: NotificationType,
        priority: Priority,
    ) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .filter(move |r| r.applies_to(notification_type, priority))
    }

    /// Channels of every matching route, deduplicated in first-seen order.
    #[must_use]
    pub fn channels_for(&self, notification_type: NotificationType, priority: Priority) -> Vec<Channel> {
        let mut channels = Vec::new();
        for route in self.select(notification_type, priority) {
            for channel in &route.channels {
                if !channels.contains(channel) {
                    channels.push(*channel);
                }
            }
        }
        channels
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        use Channel::{Email, InApp, Slack, Sms, Webhook};
        use NotificationType::{
            ApprovalRequest, ChangelogPublished, ChangelogQueued, Digest, SystemAlert,
        };
        use Priority::{Critical, High, Low, Medium};

        Self::new(vec![
            Route::new(ApprovalRequest, Low, [InApp, Email]),
            Route::new(ApprovalRequest, High, [Slack, Webhook]),
            Route::new(ChangelogQueued, Low, [InApp]),
            Route::new(ChangelogQueued, Medium, [Slack]),
            Route::new(ChangelogPublished, Low, [InApp, Email]),
            Route::new(ChangelogPublished, Medium, [Slack, Webhook]),
            Route::new(SystemAlert, Low, [InApp]),
            Route::new(SystemAlert, High, [Slack, Email]),
            Route::new(SystemAlert, Critical, [Sms, Webhook]),
            Route::new(Digest, Low, [Email]),
        ])
    }
}
