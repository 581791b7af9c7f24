//! beacon-notify: Notification routing and delivery.
//!
//! This crate provides:
//! - `NotificationRouter`: route selection, preference filtering and
//!   concurrent per-channel dispatch with timeouts
//! - `ChannelAdapter` and adapters for chat, email, SMS, outbound webhooks
//!   and the in-app feed
//! - Channel and routing configuration

pub mod channel;
pub mod channels;
pub mod config;
pub mod error;
pub mod render;
pub mod router;

pub use channel::{ChannelAdapter, Recipient};
pub use channels::{
    EmailAdapter, InAppAdapter, SlackAdapter, SmsAdapter, WebhookAdapter, default_adapters,
};
pub use config::{ChannelConfig, RoutingConfig};
pub use error::{NotifyError, Result};
pub use router::{DispatchPolicy, NotificationRouter, QuietHoursPolicy};
