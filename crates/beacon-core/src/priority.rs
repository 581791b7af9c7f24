//! Four-level priority shared by changelog records and notifications.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Priority of a derived record or a notification request.
///
/// Ordering follows rank, so `Priority::Low < Priority::Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    #[serde(alias = "urgent")]
    Critical,
}

impl Priority {
    /// Numeric rank used by route thresholds: low=1 .. critical=4.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Whether this priority satisfies a minimum threshold.
    #[must_use]
    pub const fn meets(self, threshold: Self) -> bool {
        self.rank() >= threshold.rank()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Map an issue-tracker priority name onto a changelog priority.
    ///
    /// Unknown or missing names map to `Medium`.
    #[must_use]
    pub fn from_tracker(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return Self::Medium;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "blocker" | "critical" | "highest" => Self::Critical,
            "major" | "high" => Self::High,
            "trivial" | "low" | "lowest" => Self::Low,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" | "urgent" => Ok(Self::Critical),
            other => Err(CoreError::UnknownPriority(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ordering() {
        assert!(Priority::Critical.meets(Priority::High));
        assert!(Priority::High.meets(Priority::High));
        assert!(!Priority::Low.meets(Priority::High));
        assert!(Priority::Low < Priority::Medium);
    }

    #[test]
    fn test_tracker_mapping() {
        assert_eq!(Priority::from_tracker(Some("Blocker")), Priority::Critical);
        assert_eq!(Priority::from_tracker(Some("critical")), Priority::Critical);
        assert_eq!(Priority::from_tracker(Some("Major")), Priority::High);
        assert_eq!(Priority::from_tracker(Some("High")), Priority::High);
        assert_eq!(Priority::from_tracker(Some("Minor")), Priority::Medium);
        assert_eq!(Priority::from_tracker(Some("Trivial")), Priority::Low);
        assert_eq!(Priority::from_tracker(Some("something else")), Priority::Medium);
        assert_eq!(Priority::from_tracker(None), Priority::Medium);
    }

    #[test]
    fn test_urgent_alias() {
        let p: Priority = serde_json::from_str(r#""urgent""#).unwrap();
        assert_eq!(p, Priority::Critical);
        assert_eq!("URGENT".parse::<Priority>().unwrap(), Priority::Critical);
        assert!("extreme".parse::<Priority>().is_err());
    }
}
