//! beacon-core: Domain models and decision rules for the changelog pipeline.
//!
//! This crate provides:
//! - `IncomingEvent` and webhook decoding for issue-tracker deliveries
//! - `EventClassifier`: decides whether an update completed a work item
//! - `DerivedRecord` and the text rules that produce customer-facing copy
//! - Notification requests, recipient preferences and the static route table

pub mod classifier;
pub mod error;
pub mod event;
pub mod notification;
pub mod preference;
pub mod priority;
pub mod record;
pub mod routing;
pub mod rules;
pub mod wire;

pub use classifier::{
    Classification, CompletionSignal, CurrentStatusSignal, EventClassifier, Reason,
    TransitionHistorySignal,
};
pub use error::{CoreError, Result};
pub use event::{EventKind, IncomingEvent, IssueDetails, Transition};
pub use notification::{
    Channel, DeliveryLogEntry, DeliveryResult, DispatchReport, FeedEntry, NotificationMessage,
    NotificationRequest, NotificationType,
};
pub use preference::{ChannelToggles, QuietHours, RecipientPreference};
pub use priority::Priority;
pub use record::{ApprovalStatus, Category, DerivedRecord};
pub use routing::{Route, RouteTable};
pub use wire::decode_webhook;
