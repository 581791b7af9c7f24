//! The changelog pipeline: classify, dedup, build, store, notify.

use crate::builder::RecordBuilder;
use crate::dedup::DedupGuard;
use crate::error::Result;
use beacon_core::{
    DerivedRecord, EventClassifier, IncomingEvent, NotificationMessage, NotificationRequest,
    NotificationType, Reason,
};
use beacon_notify::NotificationRouter;
use beacon_store::{RecordStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one event.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The event does not complete a work item.
    Ignored(Reason),
    /// A record already exists for this issue.
    Duplicate,
    /// A new pending record was stored.
    Created(DerivedRecord),
    /// The event was relevant but no record could be built.
    BuildFailed(String),
}

impl PipelineOutcome {
    #[must_use]
    pub const fn changelog_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Ignored(reason) => reason.message().to_string(),
            Self::Duplicate => "ignored: changelog entry already exists for this issue".to_string(),
            Self::Created(record) => {
                format!("changelog entry {} queued for approval", record.id)
            }
            Self::BuildFailed(_) => {
                "event processed but no changelog entry could be generated".to_string()
            }
        }
    }

    /// Body returned to the webhook sender. Every outcome is a success from
    /// the sender's point of view, so it never retries.
    #[must_use]
    pub fn response(&self) -> WebhookResponse {
        WebhookResponse {
            success: true,
            message: self.message(),
            changelog_created: self.changelog_created(),
        }
    }
}

/// Webhook reply body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    pub changelog_created: bool,
}

/// Turns webhook events into pending changelog records.
pub struct ChangelogPipeline {
    classifier: EventClassifier,
    dedup: DedupGuard,
    builder: RecordBuilder,
    records: Arc<dyn RecordStore>,
    notifier: Option<Arc<NotificationRouter>>,
    reviewers: Vec<String>,
}

impl ChangelogPipeline {
    #[must_use]
    pub fn new(
        classifier: EventClassifier,
        dedup: DedupGuard,
        builder: RecordBuilder,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            classifier,
            dedup,
            builder,
            records,
            notifier: None,
            reviewers: Vec::new(),
        }
    }

    /// Tell `reviewers` through `router` whenever a record is queued.
    #[must_use]
    pub fn with_notifier(mut self, router: Arc<NotificationRouter>, reviewers: Vec<String>) -> Self {
        self.notifier = Some(router);
        self.reviewers = reviewers;
        self
    }

    /// Process one event.
    ///
    /// # Errors
    /// Returns error only when storing the record fails for a reason other
    /// than a duplicate.
    pub async fn process(&self, event: &IncomingEvent) -> Result<PipelineOutcome> {
        let classification = self.classifier.classify(event);
        if !classification.relevant {
            info!(
                issue_key = %event.issue_key,
                reason = ?classification.reason,
                "Event ignored"
            );
            return Ok(PipelineOutcome::Ignored(classification.reason));
        }

        if self.dedup.already_processed(&event.issue_key).await {
            info!(issue_key = %event.issue_key, "Record already exists, skipping");
            return Ok(PipelineOutcome::Duplicate);
        }

        let record = match self.builder.build(event).await {
            Ok(record) => record,
            Err(e) => {
                warn!(issue_key = %event.issue_key, error = %e, "Failed to build record");
                return Ok(PipelineOutcome::BuildFailed(e.to_string()));
            }
        };

        match self.records.insert_record(&record).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                info!(issue_key = %event.issue_key, "Lost insert race, record already exists");
                return Ok(PipelineOutcome::Duplicate);
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            issue_key = %record.source_key,
            id = %record.id,
            category = %record.category,
            "Changelog record queued"
        );

        self.notify_queued(&record).await;

        Ok(PipelineOutcome::Created(record))
    }

    async fn notify_queued(&self, record: &DerivedRecord) {
        let Some(router) = &self.notifier else {
            return;
        };
        if self.reviewers.is_empty() {
            debug!("No reviewers configured, skipping queued notification");
            return;
        }

        let request = NotificationRequest::new(
            NotificationType::ChangelogQueued,
            record.priority,
            self.reviewers.iter().cloned(),
            NotificationMessage::new(
                format!("Changelog entry queued: {}", record.customer_title),
                format!(
                    "{} ({}) is awaiting approval.\n\n{}",
                    record.source_key, record.category, record.customer_description
                ),
            )
            .with_data(json!({
                "record_id": record.id,
                "source_key": record.source_key,
                "category": record.category,
            })),
        );

        match router.dispatch(&request).await {
            Ok(report) if !report.success => {
                warn!(id = %record.id, "Queued notification partially failed");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(id = %record.id, error = %e, "Queued notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CategoryChain, CategoryStrategy};
    use crate::error::IngestError;
    use async_trait::async_trait;
    use beacon_core::{Category, EventKind, IssueDetails, RouteTable, Transition};
    use beacon_notify::InAppAdapter;
    use beacon_store::{FeedStore, MemoryStore, Result as StoreResult};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn completed(key: &str) -> IncomingEvent {
        IncomingEvent::new(EventKind::Updated, key)
            .with_transition(Transition::status(
                "In Progress",
                "indeterminate",
                "Done",
                "done",
            ))
            .with_issue(IssueDetails {
                summary: "Fix checkout bug on mobile".to_string(),
                components: vec!["Mobile".to_string()],
                ..IssueDetails::default()
            })
    }

    fn pipeline(store: Arc<MemoryStore>) -> ChangelogPipeline {
        pipeline_with(store.clone(), store, RecordBuilder::default())
    }

    fn pipeline_with(
        records: Arc<dyn RecordStore>,
        dedup_store: Arc<dyn RecordStore>,
        builder: RecordBuilder,
    ) -> ChangelogPipeline {
        ChangelogPipeline::new(
            EventClassifier::default(),
            DedupGuard::new(dedup_store, Duration::from_millis(200)),
            builder,
            records,
        )
    }

    /// Record store whose lookups always miss, as when two deliveries race
    /// past the dedup check.
    struct BlindLookup(Arc<MemoryStore>);

    #[async_trait]
    impl RecordStore for BlindLookup {
        async fn find_by_source_key(&self, _source_key: &str) -> StoreResult<Option<DerivedRecord>> {
            Ok(None)
        }

        async fn insert_record(&self, record: &DerivedRecord) -> StoreResult<()> {
            self.0.insert_record(record).await
        }

        async fn list_records(&self) -> StoreResult<Vec<DerivedRecord>> {
            self.0.list_records().await
        }
    }

    struct Unavailable;

    #[async_trait]
    impl CategoryStrategy for Unavailable {
        fn name(&self) -> &'static str {
            "unavailable"
        }

        async fn categorize(&self, _issue: &IssueDetails) -> crate::error::Result<Category> {
            Err(IngestError::Ai("service down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_completed_transition_creates_one_record() {
        let store = Arc::new(MemoryStore::new());
        let outcome = pipeline(store.clone()).process(&completed("ABC-1")).await.unwrap();

        assert!(outcome.changelog_created());
        let PipelineOutcome::Created(record) = &outcome else {
            panic!("expected a created record, got {outcome:?}");
        };
        assert_eq!(record.category, Category::Fixed);
        assert_eq!(store.list_records().await.unwrap().len(), 1);

        let response = outcome.response();
        assert!(response.success);
        assert!(response.changelog_created);
    }

    #[tokio::test]
    async fn test_replay_is_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(store.clone());

        pipeline.process(&completed("ABC-1")).await.unwrap();
        let replay = pipeline.process(&completed("ABC-1")).await.unwrap();

        assert_eq!(replay, PipelineOutcome::Duplicate);
        assert!(!replay.response().changelog_created);
        assert!(replay.response().success);
        assert_eq!(store.list_records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_race_past_dedup_is_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let blind: Arc<dyn RecordStore> = Arc::new(BlindLookup(store.clone()));
        let pipeline = pipeline_with(blind.clone(), blind, RecordBuilder::default());

        let first_event = completed("ABC-1");
        let second_event = completed("ABC-1");
        let (first, second) = tokio::join!(
            pipeline.process(&first_event),
            pipeline.process(&second_event)
        );
        let outcomes = [first.unwrap(), second.unwrap()];

        assert_eq!(outcomes.iter().filter(|o| o.changelog_created()).count(), 1);
        assert!(outcomes.contains(&PipelineOutcome::Duplicate));
        assert_eq!(store.list_records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ignored_events_touch_nothing() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(store.clone());

        let created = IncomingEvent::new(EventKind::Created, "ABC-1");
        assert_eq!(
            pipeline.process(&created).await.unwrap(),
            PipelineOutcome::Ignored(Reason::IssueCreated)
        );

        let reopened = IncomingEvent::new(EventKind::Updated, "ABC-2").with_transition(
            Transition::status("Done", "done", "In Progress", "indeterminate"),
        );
        let outcome = pipeline.process(&reopened).await.unwrap();
        assert_eq!(outcome, PipelineOutcome::Ignored(Reason::Reopened));
        assert!(outcome.response().success);

        assert!(store.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_failure_creates_nothing() {
        let store = Arc::new(MemoryStore::new());
        let builder = RecordBuilder::new(CategoryChain::new(vec![Box::new(Unavailable)]));
        let pipeline = pipeline_with(store.clone(), store.clone(), builder);

        let outcome = pipeline.process(&completed("ABC-1")).await.unwrap();

        assert!(matches!(outcome, PipelineOutcome::BuildFailed(_)));
        let response = outcome.response();
        assert!(response.success);
        assert!(!response.changelog_created);
        assert!(store.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_failure_is_error() {
        let store = Arc::new(MemoryStore::new());
        let records = Arc::new(MemoryStore::new());
        records.set_unavailable(true);
        let pipeline = pipeline_with(records, store, RecordBuilder::default());

        assert!(pipeline.process(&completed("ABC-1")).await.is_err());
    }

    #[tokio::test]
    async fn test_reviewers_get_queued_notification() {
        let store = Arc::new(MemoryStore::new());
        let router = NotificationRouter::new(RouteTable::default(), store.clone(), store.clone())
            .with_adapter(Arc::new(InAppAdapter::new(store.clone())));
        let pipeline = pipeline(store.clone()).with_notifier(Arc::new(router), vec!["lead".to_string()]);

        pipeline.process(&completed("ABC-1")).await.unwrap();

        let feed = store.feed_for("lead").await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].notification_type, NotificationType::ChangelogQueued);
        assert_eq!(feed[0].data["source_key"], "ABC-1");
    }

    #[tokio::test]
    async fn test_notification_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        let broken = Arc::new(MemoryStore::new());
        broken.set_unavailable(true);
        let router = NotificationRouter::new(RouteTable::default(), broken.clone(), broken);
        let pipeline = pipeline(store.clone()).with_notifier(Arc::new(router), vec!["lead".to_string()]);

        let outcome = pipeline.process(&completed("ABC-1")).await.unwrap();

        assert!(outcome.changelog_created());
        assert_eq!(store.list_records().await.unwrap().len(), 1);
    }
}
