//! Builds a derived record from a completed issue.

use crate::category::CategoryChain;
use crate::error::{IngestError, Result};
use beacon_core::rules::{
    customer_description, customer_title, estimate_affected_users, extract_highlights,
    has_breaking_changes,
};
use beacon_core::{DerivedRecord, IncomingEvent, Priority};
use tracing::debug;

/// Turns an event into a pending customer-facing record.
pub struct RecordBuilder {
    categories: CategoryChain,
}

impl RecordBuilder {
    #[must_use]
    pub const fn new(categories: CategoryChain) -> Self {
        Self { categories }
    }

    /// Build a record for the event's issue.
    ///
    /// # Errors
    /// Returns error if the issue has no summary or no category strategy
    /// succeeds.
    pub async fn build(&self, event: &IncomingEvent) -> Result<DerivedRecord> {
        let issue = &event.issue;
        if issue.summary.trim().is_empty() {
            return Err(IngestError::Build(format!(
                "issue {} has no summary",
                event.issue_key
            )));
        }

        let category = self.categories.categorize(issue).await?;

        let mut record = DerivedRecord::new(&event.issue_key, category);
        record.source_issue_id.clone_from(&event.issue_id);
        record.original_title.clone_from(&issue.summary);
        record.customer_title = customer_title(&issue.summary);
        record.customer_description = customer_description(
            category,
            &record.customer_title,
            issue.description.as_deref(),
        );
        record.highlights = issue
            .description
            .as_deref()
            .map(extract_highlights)
            .unwrap_or_default();
        record.breaking_changes = has_breaking_changes(issue);
        record.priority = Priority::from_tracker(issue.priority.as_deref());
        record.affected_users = estimate_affected_users(&issue.components, &issue.labels);

        debug!(
            source_key = %record.source_key,
            category = %record.category,
            affected_users = record.affected_users,
            "Built derived record"
        );

        Ok(record)
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(CategoryChain::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{ApprovalStatus, Category, EventKind, IssueDetails};
    use pretty_assertions::assert_eq;

    fn event(issue: IssueDetails) -> IncomingEvent {
        IncomingEvent::new(EventKind::Updated, "ABC-1").with_issue(issue)
    }

    #[tokio::test]
    async fn test_builds_pending_record() {
        let issue = IssueDetails {
            summary: "ABC-1: Add CSV export to dashboard UI".to_string(),
            description: Some("- Export any table\n- Choose columns".to_string()),
            priority: Some("Major".to_string()),
            issue_type: Some("Story".to_string()),
            components: vec!["Dashboard".to_string(), "API".to_string()],
            labels: vec!["enterprise".to_string()],
        };

        let record = RecordBuilder::default().build(&event(issue)).await.unwrap();

        assert_eq!(record.source_key, "ABC-1");
        assert_eq!(record.category, Category::Added);
        assert_eq!(record.approval_status, ApprovalStatus::Pending);
        assert_eq!(record.priority, Priority::High);
        assert_eq!(record.affected_users, 3000);
        assert_eq!(record.original_title, "ABC-1: Add CSV export to dashboard UI");
        assert!(!record.customer_title.starts_with("ABC-1"));
        assert!(record.customer_title.contains("interface"));
        assert_eq!(record.highlights.len(), 2);
        assert!(!record.breaking_changes);
    }

    #[tokio::test]
    async fn test_beta_label_caps_reach() {
        let issue = IssueDetails {
            summary: "Improve frontend load time".to_string(),
            components: vec!["Frontend".to_string()],
            labels: vec!["beta".to_string()],
            ..IssueDetails::default()
        };

        let record = RecordBuilder::default().build(&event(issue)).await.unwrap();
        assert_eq!(record.affected_users, 200);
    }

    #[tokio::test]
    async fn test_missing_summary_fails() {
        let err = RecordBuilder::default()
            .build(&event(IssueDetails::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Build(_)));
    }
}
