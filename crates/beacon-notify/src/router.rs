//! Notification router: route selection, per-recipient eligibility and
//! concurrent per-channel fan-out.

use crate::channel::{ChannelAdapter, Recipient};
use crate::error::{NotifyError, Result};
use beacon_core::{
    Channel, DeliveryLogEntry, DeliveryResult, DispatchReport, NotificationRequest, Priority,
    RecipientPreference, RouteTable,
};
use beacon_store::{DeliveryLog, PreferenceStore};
use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How recipients inside their quiet window are treated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuietHoursPolicy {
    /// Quiet hours are stored but never suppress delivery.
    #[default]
    PassThrough,
    /// Drop recipients in their quiet window unless the request priority is
    /// at least this level.
    SuppressBelow(Priority),
}

/// Runtime knobs for a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub channel_timeout: Duration,
    pub quiet_hours: QuietHoursPolicy,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            channel_timeout: Duration::from_secs(5),
            quiet_hours: QuietHoursPolicy::PassThrough,
        }
    }
}

/// Routes notification requests to channel adapters.
pub struct NotificationRouter {
    routes: RouteTable,
    preferences: Arc<dyn PreferenceStore>,
    log: Arc<dyn DeliveryLog>,
    adapters: HashMap<Channel, Arc<dyn ChannelAdapter>>,
    policy: DispatchPolicy,
}

impl NotificationRouter {
    #[must_use]
    pub fn new(
        routes: RouteTable,
        preferences: Arc<dyn PreferenceStore>,
        log: Arc<dyn DeliveryLog>,
    ) -> Self {
        Self {
            routes,
            preferences,
            log,
            adapters: HashMap::new(),
            policy: DispatchPolicy::default(),
        }
    }

    /// Register an adapter, replacing any previous one for the same channel.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.adapters.insert(adapter.channel(), adapter);
        self
    }

    #[must_use]
    pub fn with_adapters(self, adapters: impl IntoIterator<Item = Arc<dyn ChannelAdapter>>) -> Self {
        adapters.into_iter().fold(self, Self::with_adapter)
    }

    #[must_use]
    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Dispatch a request now.
    ///
    /// # Errors
    /// Returns `NotifyError::Invalid` for malformed requests and
    /// `NotifyError::PreferencesUnavailable` if preferences cannot be loaded.
    /// Channel failures never fail the dispatch; they are reported per channel.
    pub async fn dispatch(&self, request: &NotificationRequest) -> Result<DispatchReport> {
        self.dispatch_at(request, Utc::now()).await
    }

    /// Dispatch a request as if it were `now` (quiet hours are evaluated
    /// against this instant).
    ///
    /// # Errors
    /// See [`NotificationRouter::dispatch`].
    pub async fn dispatch_at(
        &self,
        request: &NotificationRequest,
        now: DateTime<Utc>,
    ) -> Result<DispatchReport> {
        let outcome = self.route(request, now).await;

        let entry = match &outcome {
            Ok(report) => DeliveryLogEntry::new(request, report),
            Err(e) => DeliveryLogEntry::rejected(request, e.to_string()),
        };
        if let Err(e) = self.log.append_delivery(&entry).await {
            warn!(error = %e, "Failed to write delivery log");
        }

        outcome
    }

    async fn route(
        &self,
        request: &NotificationRequest,
        now: DateTime<Utc>,
    ) -> Result<DispatchReport> {
        request.validate()?;

        let channels = self.select_channels(request);
        let preferences = self.load_preferences(&request.recipients).await?;

        debug!(
            notification_type = %request.notification_type,
            priority = %request.priority,
            channels = ?channels,
            recipients = preferences.len(),
            "Dispatching notification"
        );

        let deliveries = channels.into_iter().map(|channel| {
            let eligible = self.eligible(channel, request, &preferences, now);
            self.deliver(channel, request, eligible)
        });
        let report = DispatchReport::from_results(join_all(deliveries).await);

        info!(
            notification_type = %request.notification_type,
            success = report.success,
            channels_used = ?report.channels_used,
            recipients_reached = report.recipients_reached,
            "Notification dispatched"
        );

        Ok(report)
    }

    /// Explicit channels win over the route table; either way each channel
    /// appears once.
    fn select_channels(&self, request: &NotificationRequest) -> Vec<Channel> {
        match &request.channels {
            Some(explicit) => {
                let mut channels = Vec::with_capacity(explicit.len());
                for channel in explicit {
                    if !channels.contains(channel) {
                        channels.push(*channel);
                    }
                }
                channels
            }
            None => self
                .routes
                .channels_for(request.notification_type, request.priority),
        }
    }

    async fn load_preferences(&self, recipients: &[String]) -> Result<Vec<RecipientPreference>> {
        let mut user_ids: Vec<&str> = Vec::with_capacity(recipients.len());
        for id in recipients.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
            if !user_ids.contains(&id) {
                user_ids.push(id);
            }
        }

        let lookups = user_ids.into_iter().map(|user_id| async move {
            self.preferences
                .get_preference(user_id)
                .await
                .map(|stored| stored.unwrap_or_else(|| RecipientPreference::default_for(user_id)))
        });

        try_join_all(lookups)
            .await
            .map_err(NotifyError::PreferencesUnavailable)
    }

    fn eligible(
        &self,
        channel: Channel,
        request: &NotificationRequest,
        preferences: &[RecipientPreference],
        now: DateTime<Utc>,
    ) -> Vec<Recipient> {
        preferences
            .iter()
            .filter(|p| p.channel_enabled(channel))
            .filter(|p| p.type_enabled(request.notification_type))
            .filter(|p| request.priority.meets(p.priority_threshold))
            .filter(|p| self.quiet_hours_allow(p, request.priority, now))
            .map(Recipient::from)
            .collect()
    }

    fn quiet_hours_allow(
        &self,
        preference: &RecipientPreference,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> bool {
        let QuietHoursPolicy::SuppressBelow(level) = self.policy.quiet_hours else {
            return true;
        };
        if priority.meets(level) {
            return true;
        }

        match preference.quiet_hours.contains(now) {
            Ok(quiet) => !quiet,
            Err(e) => {
                warn!(user_id = %preference.user_id, error = %e, "Invalid quiet hours, ignoring");
                true
            }
        }
    }

    async fn deliver(
        &self,
        channel: Channel,
        request: &NotificationRequest,
        recipients: Vec<Recipient>,
    ) -> DeliveryResult {
        if recipients.is_empty() {
            debug!(%channel, "No eligible recipients, skipping channel");
            return DeliveryResult::skipped(channel);
        }

        let Some(adapter) = self.adapters.get(&channel) else {
            warn!(%channel, "No adapter registered for channel");
            return DeliveryResult::failed(channel, "no adapter registered");
        };

        match tokio::time::timeout(self.policy.channel_timeout, adapter.send(request, &recipients))
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(%channel, error = %e, "Channel delivery failed");
                DeliveryResult::failed(channel, e.to_string())
            }
            Err(_) => {
                warn!(
                    %channel,
                    timeout_ms = %self.policy.channel_timeout.as_millis(),
                    "Channel delivery timed out"
                );
                DeliveryResult::failed(
                    channel,
                    format!("timed out after {}ms", self.policy.channel_timeout.as_millis()),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use beacon_core::{NotificationMessage, NotificationType};
    use beacon_store::MemoryStore;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Deliver,
        Simulate,
        Fail,
        Hang,
    }

    struct FakeAdapter {
        channel: Channel,
        behaviour: Behaviour,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FakeAdapter {
        fn new(channel: Channel, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                channel,
                behaviour,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChannelAdapter for FakeAdapter {
        fn channel(&self) -> Channel {
            self.channel
        }

        async fn send(
            &self,
            _request: &NotificationRequest,
            recipients: &[Recipient],
        ) -> Result<DeliveryResult> {
            self.calls
                .lock()
                .unwrap()
                .push(recipients.iter().map(|r| r.user_id.clone()).collect());
            match self.behaviour {
                Behaviour::Deliver => Ok(DeliveryResult::delivered(self.channel, recipients.len())),
                Behaviour::Simulate => Ok(DeliveryResult::simulated(self.channel, recipients.len())),
                Behaviour::Fail => Err(NotifyError::Status {
                    channel: self.channel,
                    status: 502,
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(DeliveryResult::delivered(self.channel, recipients.len()))
                }
            }
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        adapters: HashMap<Channel, Arc<FakeAdapter>>,
    }

    impl Fixture {
        fn new(behaviours: &[(Channel, Behaviour)]) -> Self {
            Self {
                store: Arc::new(MemoryStore::new()),
                adapters: behaviours
                    .iter()
                    .map(|(c, b)| (*c, FakeAdapter::new(*c, *b)))
                    .collect(),
            }
        }

        fn delivering() -> Self {
            Self::new(&Channel::ALL.map(|c| (c, Behaviour::Deliver)))
        }

        fn router(&self) -> NotificationRouter {
            let mut router =
                NotificationRouter::new(RouteTable::default(), self.store.clone(), self.store.clone())
                    .with_policy(DispatchPolicy {
                        channel_timeout: Duration::from_millis(100),
                        quiet_hours: QuietHoursPolicy::PassThrough,
                    });
            for adapter in self.adapters.values() {
                router = router.with_adapter(adapter.clone());
            }
            router
        }

        fn calls(&self, channel: Channel) -> Vec<Vec<String>> {
            self.adapters[&channel].calls()
        }
    }

    fn request(
        notification_type: NotificationType,
        priority: Priority,
        recipients: &[&str],
    ) -> NotificationRequest {
        NotificationRequest::new(
            notification_type,
            priority,
            recipients.iter().copied(),
            NotificationMessage::new("Review ABC-1", "A record awaits approval"),
        )
    }

    #[tokio::test]
    async fn test_disabled_webhook_is_excluded() {
        let fixture = Fixture::delivering();
        fixture
            .store
            .put_preference(
                &RecipientPreference::default_for("u1")
                    .with_channel(Channel::Slack, true)
                    .with_channel(Channel::Webhook, false),
            )
            .await
            .unwrap();

        let report = fixture
            .router()
            .dispatch(&request(NotificationType::ApprovalRequest, Priority::High, &["u1"]))
            .await
            .unwrap();

        assert!(report.success);
        assert!(report.channels_used.contains(&Channel::Slack));
        assert!(!report.channels_used.contains(&Channel::Webhook));
        assert_eq!(report.result_for(Channel::Webhook).unwrap().recipients_reached, 0);
        assert!(fixture.calls(Channel::Webhook).is_empty());
    }

    #[tokio::test]
    async fn test_simulated_channel_keeps_success() {
        let fixture = Fixture::new(&[
            (Channel::InApp, Behaviour::Deliver),
            (Channel::Email, Behaviour::Simulate),
        ]);

        let report = fixture
            .router()
            .dispatch(&request(NotificationType::ApprovalRequest, Priority::Low, &["u1"]))
            .await
            .unwrap();

        assert!(report.success);
        let email = report.result_for(Channel::Email).unwrap();
        assert!(email.mock);
        assert!(email.success);
    }

    #[tokio::test]
    async fn test_slack_disabled_never_invoked() {
        let fixture = Fixture::delivering();
        fixture
            .store
            .put_preference(&RecipientPreference::default_for("quiet").with_channel(Channel::Slack, false))
            .await
            .unwrap();
        let router = fixture.router();

        let types = [
            NotificationType::ApprovalRequest,
            NotificationType::ChangelogQueued,
            NotificationType::ChangelogPublished,
            NotificationType::SystemAlert,
            NotificationType::Digest,
        ];
        let priorities = [Priority::Low, Priority::Medium, Priority::High, Priority::Critical];
        for notification_type in types {
            for priority in priorities {
                let mut req = request(notification_type, priority, &["quiet"]);
                router.dispatch(&req).await.unwrap();
                req.channels = Some(vec![Channel::Slack]);
                router.dispatch(&req).await.unwrap();
            }
        }

        assert!(fixture.calls(Channel::Slack).is_empty());
    }

    #[tokio::test]
    async fn test_only_eligible_recipients_reach_adapter() {
        let fixture = Fixture::delivering();
        fixture
            .store
            .put_preference(
                &RecipientPreference::default_for("u2")
                    .with_type(NotificationType::SystemAlert, false),
            )
            .await
            .unwrap();

        fixture
            .router()
            .dispatch(&request(NotificationType::SystemAlert, Priority::Low, &["u1", "u2", "u1", " "]))
            .await
            .unwrap();

        assert_eq!(fixture.calls(Channel::InApp), vec![vec!["u1".to_string()]]);
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_abort_other_channels() {
        let fixture = Fixture::new(&[
            (Channel::InApp, Behaviour::Deliver),
            (Channel::Email, Behaviour::Fail),
        ]);

        let report = fixture
            .router()
            .dispatch(&request(NotificationType::ApprovalRequest, Priority::Low, &["u1"]))
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.channels_used, vec![Channel::InApp]);
        assert!(!report.result_for(Channel::Email).unwrap().success);
        assert_eq!(fixture.calls(Channel::InApp).len(), 1);
    }

    #[tokio::test]
    async fn test_slow_channel_times_out() {
        let fixture = Fixture::new(&[
            (Channel::InApp, Behaviour::Deliver),
            (Channel::Email, Behaviour::Hang),
        ]);

        let report = fixture
            .router()
            .dispatch(&request(NotificationType::ApprovalRequest, Priority::Low, &["u1"]))
            .await
            .unwrap();

        let email = report.result_for(Channel::Email).unwrap();
        assert!(!email.success);
        assert!(email.detail.contains("timed out"));
        assert!(report.result_for(Channel::InApp).unwrap().success);
    }

    #[tokio::test]
    async fn test_explicit_channels_replace_routes() {
        let fixture = Fixture::delivering();

        let req = request(NotificationType::Digest, Priority::Low, &["u1"])
            .with_channels([Channel::Webhook, Channel::Webhook]);
        let report = fixture.router().dispatch(&req).await.unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.channels_used, vec![Channel::Webhook]);
        assert!(fixture.calls(Channel::Email).is_empty());
    }

    #[tokio::test]
    async fn test_priority_threshold_filters_recipient() {
        let fixture = Fixture::delivering();
        let mut pref = RecipientPreference::default_for("u1");
        pref.priority_threshold = Priority::High;
        fixture.store.put_preference(&pref).await.unwrap();

        let report = fixture
            .router()
            .dispatch(&request(NotificationType::SystemAlert, Priority::Medium, &["u1"]))
            .await
            .unwrap();

        assert!(report.success);
        assert!(report.channels_used.is_empty());
        assert!(fixture.calls(Channel::InApp).is_empty());
    }

    #[tokio::test]
    async fn test_quiet_hours_policy() {
        let fixture = Fixture::delivering();
        let mut pref = RecipientPreference::default_for("u1");
        pref.quiet_hours.enabled = true;
        fixture.store.put_preference(&pref).await.unwrap();

        let night = Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).unwrap();
        let req = request(NotificationType::SystemAlert, Priority::Low, &["u1"]);

        fixture.router().dispatch_at(&req, night).await.unwrap();
        assert_eq!(fixture.calls(Channel::InApp).len(), 1);

        let suppressing = fixture.router().with_policy(DispatchPolicy {
            channel_timeout: Duration::from_millis(100),
            quiet_hours: QuietHoursPolicy::SuppressBelow(Priority::High),
        });
        suppressing.dispatch_at(&req, night).await.unwrap();
        assert_eq!(fixture.calls(Channel::InApp).len(), 1);

        let urgent = request(NotificationType::SystemAlert, Priority::Critical, &["u1"]);
        suppressing.dispatch_at(&urgent, night).await.unwrap();
        assert_eq!(fixture.calls(Channel::InApp).len(), 2);
    }

    #[tokio::test]
    async fn test_preferences_unavailable() {
        let fixture = Fixture::delivering();
        fixture.store.set_unavailable(true);

        let err = fixture
            .router()
            .dispatch(&request(NotificationType::Digest, Priority::Low, &["u1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::PreferencesUnavailable(_)));
        assert!(fixture.calls(Channel::Email).is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_preferences_are_logged() {
        let preferences = Arc::new(MemoryStore::new());
        preferences.set_unavailable(true);
        let log = Arc::new(MemoryStore::new());
        let router = NotificationRouter::new(RouteTable::default(), preferences, log.clone());

        router
            .dispatch(&request(NotificationType::Digest, Priority::Low, &["u1"]))
            .await
            .unwrap_err();

        let entries = log.recent_deliveries(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].success);
        assert!(entries[0].results.is_empty());
        assert!(entries[0].error.as_deref().unwrap().contains("preferences"));
    }

    #[tokio::test]
    async fn test_empty_recipients_is_invalid() {
        let fixture = Fixture::delivering();

        let err = fixture
            .router()
            .dispatch(&request(NotificationType::Digest, Priority::Low, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Invalid(_)));

        let log = fixture.store.recent_deliveries(10).await.unwrap();
        assert_eq!(log.len(), 1);
        assert!(!log[0].success);
        assert!(log[0].error.is_some());
    }

    #[tokio::test]
    async fn test_every_dispatch_is_logged() {
        let fixture = Fixture::new(&[(Channel::Email, Behaviour::Fail)]);
        let router = fixture.router();

        router
            .dispatch(&request(NotificationType::Digest, Priority::Low, &["u1"]))
            .await
            .unwrap();

        let log = fixture.store.recent_deliveries(10).await.unwrap();
        assert_eq!(log.len(), 1);
        assert!(!log[0].success);
    }
}
