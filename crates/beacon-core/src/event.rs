//! Inbound issue-tracker event model.

use serde::{Deserialize, Serialize};

/// Kind of change an issue-tracker webhook reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Deleted => write!(f, "deleted"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One entry of an issue's changelog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Changed field name; only `status` entries matter for classification.
    pub field: String,
    #[serde(default)]
    pub from_status: Option<String>,
    #[serde(default)]
    pub to_status: Option<String>,
    #[serde(default)]
    pub from_status_category: Option<String>,
    #[serde(default)]
    pub to_status_category: Option<String>,
}

impl Transition {
    /// Build a status transition with category metadata.
    #[must_use]
    pub fn status(
        from: impl Into<String>,
        from_category: impl Into<String>,
        to: impl Into<String>,
        to_category: impl Into<String>,
    ) -> Self {
        Self {
            field: "status".to_string(),
            from_status: Some(from.into()),
            to_status: Some(to.into()),
            from_status_category: Some(from_category.into()),
            to_status_category: Some(to_category.into()),
        }
    }

    /// Build a status transition carrying names only.
    #[must_use]
    pub fn status_names(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            field: "status".to_string(),
            from_status: Some(from.into()),
            to_status: Some(to.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn is_status(&self) -> bool {
        self.field.eq_ignore_ascii_case("status")
    }
}

/// Issue fields the record builder reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetails {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Tracker priority name (e.g. "Blocker", "Major").
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// A validated issue-tracker webhook delivery.
///
/// `transition_history` is optional: some delivery providers omit the changelog
/// entirely, and classification then falls back to the current status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IncomingEvent {
    pub event_kind: EventKind,
    pub issue_key: String,
    #[serde(default)]
    pub issue_id: Option<String>,
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub current_status_category: Option<String>,
    #[serde(default)]
    pub transition_history: Option<Vec<Transition>>,
    #[serde(default)]
    pub issue: IssueDetails,
}

impl IncomingEvent {
    #[must_use]
    pub fn new(event_kind: EventKind, issue_key: impl Into<String>) -> Self {
        Self {
            event_kind,
            issue_key: issue_key.into(),
            issue_id: None,
            current_status: None,
            current_status_category: None,
            transition_history: None,
            issue: IssueDetails::default(),
        }
    }

    #[must_use]
    pub fn with_current_status(
        mut self,
        status: impl Into<String>,
        category: Option<&str>,
    ) -> Self {
        self.current_status = Some(status.into());
        self.current_status_category = category.map(String::from);
        self
    }

    #[must_use]
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition_history
            .get_or_insert_with(Vec::new)
            .push(transition);
        self
    }

    #[must_use]
    pub fn with_issue(mut self, issue: IssueDetails) -> Self {
        self.issue = issue;
        self
    }

    /// Transition history, treating an absent changelog as empty.
    #[must_use]
    pub fn history(&self) -> &[Transition] {
        self.transition_history.as_deref().unwrap_or(&[])
    }
}
