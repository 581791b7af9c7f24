//! Derived (customer-facing) changelog record.

use crate::error::{CoreError, Result};
use crate::priority::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Changelog category of a derived record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Category {
    Added,
    Fixed,
    Improved,
    Security,
    Deprecated,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::Added,
        Self::Fixed,
        Self::Improved,
        Self::Security,
        Self::Deprecated,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "Added",
            Self::Fixed => "Fixed",
            Self::Improved => "Improved",
            Self::Security => "Security",
            Self::Deprecated => "Deprecated",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_matches(|c: char| !c.is_ascii_alphabetic());
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::UnknownCategory(s.to_string()))
    }
}

/// Review state of a derived record. Records are always created `Pending`;
/// later states belong to the approval workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A customer-facing update generated from a completed work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedRecord {
    /// Record identifier (e.g. "rec_4f1c...").
    pub id: String,

    /// Issue key this record was derived from; unique across records.
    pub source_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_issue_id: Option<String>,

    pub category: Category,

    /// Issue summary before rewriting.
    pub original_title: String,

    pub customer_title: String,

    pub customer_description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,

    pub breaking_changes: bool,

    pub priority: Priority,

    pub affected_users: u32,

    pub approval_status: ApprovalStatus,

    pub created_at: DateTime<Utc>,
}

impl DerivedRecord {
    /// Create a pending record with a fresh id and timestamp.
    #[must_use]
    pub fn new(source_key: impl Into<String>, category: Category) -> Self {
        Self {
            id: format!("rec_{}", Uuid::new_v4().as_simple()),
            source_key: source_key.into(),
            source_issue_id: None,
            category,
            original_title: String::new(),
            customer_title: String::new(),
            customer_description: String::new(),
            highlights: Vec::new(),
            breaking_changes: false,
            priority: Priority::Medium,
            affected_users: 0,
            approval_status: ApprovalStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
