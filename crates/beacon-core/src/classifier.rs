//! Completion classification for issue-tracker events.
//!
//! An issue is modelled as a two-state machine `{NotDone, Done}`. Only the
//! `NotDone -> Done` edge makes an event relevant; `Done -> Done`,
//! `Done -> NotDone` (reopen) and `NotDone -> NotDone` are no-ops.
//!
//! Detection runs an ordered list of [`CompletionSignal`]s. The transition
//! history signal is authoritative when a changelog is present. The current
//! status signal is the fallback for deliveries without one; it cannot see
//! reopen or no-op moves and relies on the dedup guard to avoid re-triggering
//! on every later webhook for an issue that stays done.

use crate::event::{EventKind, IncomingEvent, Transition};
use serde::Serialize;

/// Status names treated as done when no category metadata is available.
pub const DONE_STATUS_NAMES: &[&str] =
    &["done", "deployed", "released", "closed", "resolved", "completed"];

/// Status category key that means "work complete".
const DONE_CATEGORY: &str = "done";

/// Why an event was or was not considered relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    IssueCreated,
    UnsupportedEvent,
    CompletedTransition,
    AlreadyDone,
    Reopened,
    NotCompleted,
    NoStatusChange,
    CurrentStatusDone,
    CurrentStatusNotDone,
}

impl Reason {
    /// Message echoed back to the webhook sender.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::IssueCreated => "ignored: issue creation events do not produce changelog entries",
            Self::UnsupportedEvent => "ignored: event kind is not an issue update",
            Self::CompletedTransition => "issue transitioned into a done status",
            Self::AlreadyDone => "ignored: issue moved between done statuses",
            Self::Reopened => "ignored: issue was reopened",
            Self::NotCompleted => "ignored: status change does not complete the issue",
            Self::NoStatusChange => "ignored: no status change in this update",
            Self::CurrentStatusDone => "issue is currently done (no changelog in delivery)",
            Self::CurrentStatusNotDone => "ignored: issue is not done (no changelog in delivery)",
        }
    }
}

/// Outcome of classifying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub relevant: bool,
    pub reason: Reason,
}

impl Classification {
    #[must_use]
    pub const fn relevant(reason: Reason) -> Self {
        Self {
            relevant: true,
            reason,
        }
    }

    #[must_use]
    pub const fn ignored(reason: Reason) -> Self {
        Self {
            relevant: false,
            reason,
        }
    }
}

/// One way of deciding whether an update completed the issue.
///
/// Returns `None` to defer to the next signal in the chain.
pub trait CompletionSignal: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, event: &IncomingEvent) -> Option<Classification>;
}

/// Whether a status is done, preferring the category over the name.
#[must_use]
pub fn is_done(name: Option<&str>, category: Option<&str>) -> bool {
    if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
        return category.eq_ignore_ascii_case(DONE_CATEGORY);
    }
    name.is_some_and(is_done_name)
}

/// Keyword match of a status name against [`DONE_STATUS_NAMES`].
#[must_use]
pub fn is_done_name(name: &str) -> bool {
    let normalized = name.trim().to_ascii_lowercase();
    DONE_STATUS_NAMES.contains(&normalized.as_str())
}

/// Classify a single status transition.
fn classify_transition(transition: &Transition) -> Classification {
    let from_done = is_done(
        transition.from_status.as_deref(),
        transition.from_status_category.as_deref(),
    );
    let to_done = is_done(
        transition.to_status.as_deref(),
        transition.to_status_category.as_deref(),
    );

    match (from_done, to_done) {
        (false, true) => Classification::relevant(Reason::CompletedTransition),
        (true, true) => Classification::ignored(Reason::AlreadyDone),
        (true, false) => Classification::ignored(Reason::Reopened),
        (false, false) => Classification::ignored(Reason::NotCompleted),
    }
}

/// Decides from the changelog carried by the delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransitionHistorySignal;

impl CompletionSignal for TransitionHistorySignal {
    fn name(&self) -> &'static str {
        "transition_history"
    }

    fn evaluate(&self, event: &IncomingEvent) -> Option<Classification> {
        let history = event.history();
        if history.is_empty() {
            return None;
        }

        let mut last = Classification::ignored(Reason::NoStatusChange);
        for transition in history.iter().filter(|t| t.is_status()) {
            let verdict = classify_transition(transition);
            if verdict.relevant {
                return Some(verdict);
            }
            last = verdict;
        }
        Some(last)
    }
}

/// Decides from the issue's current status alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentStatusSignal;

impl CompletionSignal for CurrentStatusSignal {
    fn name(&self) -> &'static str {
        "current_status"
    }

    fn evaluate(&self, event: &IncomingEvent) -> Option<Classification> {
        let done = is_done(
            event.current_status.as_deref(),
            event.current_status_category.as_deref(),
        );
        Some(if done {
            Classification::relevant(Reason::CurrentStatusDone)
        } else {
            Classification::ignored(Reason::CurrentStatusNotDone)
        })
    }
}

/// Runs the event-kind gate and then the completion signals in order.
pub struct EventClassifier {
    signals: Vec<Box<dyn CompletionSignal>>,
}

impl EventClassifier {
    #[must_use]
    pub fn new(signals: Vec<Box<dyn CompletionSignal>>) -> Self {
        Self { signals }
    }

    /// Signal names in evaluation order.
    #[must_use]
    pub fn signal_names(&self) -> Vec<&'static str> {
        self.signals.iter().map(|s| s.name()).collect()
    }

    #[must_use]
    pub fn classify(&self, event: &IncomingEvent) -> Classification {
        match event.event_kind {
            EventKind::Created => return Classification::ignored(Reason::IssueCreated),
            EventKind::Updated => {}
            EventKind::Deleted | EventKind::Other => {
                return Classification::ignored(Reason::UnsupportedEvent);
            }
        }

        self.signals
            .iter()
            .find_map(|signal| signal.evaluate(event))
            .unwrap_or(Classification::ignored(Reason::NotCompleted))
    }
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::new(vec![
            Box::new(TransitionHistorySignal),
            Box::new(CurrentStatusSignal),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Transition;

    fn updated(transition: Transition) -> IncomingEvent {
        IncomingEvent::new(EventKind::Updated, "ABC-1").with_transition(transition)
    }

    #[test]
    fn test_created_is_ignored_even_when_done() {
        let event = IncomingEvent::new(EventKind::Created, "ABC-1")
            .with_current_status("Done", Some("done"));
        let result = EventClassifier::default().classify(&event);
        assert_eq!(result, Classification::ignored(Reason::IssueCreated));
    }

    #[test]
    fn test_other_kinds_are_ignored() {
        let event = IncomingEvent::new(EventKind::Deleted, "ABC-1")
            .with_transition(Transition::status("In Progress", "indeterminate", "Done", "done"));
        assert!(!EventClassifier::default().classify(&event).relevant);
    }

    #[test]
    fn test_not_done_to_done_is_relevant() {
        let event = updated(Transition::status("In Progress", "indeterminate", "Done", "done"));
        let result = EventClassifier::default().classify(&event);
        assert_eq!(result, Classification::relevant(Reason::CompletedTransition));
    }

    #[test]
    fn test_done_to_done_is_ignored() {
        for (from, to) in [("Done", "Released"), ("Closed", "Done"), ("Done", "Done")] {
            let event = updated(Transition::status(from, "done", to, "done"));
            let result = EventClassifier::default().classify(&event);
            assert_eq!(result, Classification::ignored(Reason::AlreadyDone), "{from} -> {to}");
        }
    }

    #[test]
    fn test_reopen_is_ignored() {
        for to_category in ["new", "indeterminate", "todo"] {
            let event = updated(Transition::status("Done", "done", "Reopened", to_category));
            let result = EventClassifier::default().classify(&event);
            assert_eq!(result, Classification::ignored(Reason::Reopened));
        }
    }

    #[test]
    fn test_category_beats_name() {
        // Named "Done" but categorised as in-progress by the tracker.
        let event = updated(Transition::status("Backlog", "new", "Done", "indeterminate"));
        assert!(!EventClassifier::default().classify(&event).relevant);
    }

    #[test]
    fn test_keyword_fallback_without_categories() {
        let cases = [
            ("In Review", "Deployed", true),
            ("QA", "resolved", true),
            ("Closed", "Released", false),
            ("Done", "In Progress", false),
            ("To Do", "In Progress", false),
        ];
        for (from, to, expected) in cases {
            let event = updated(Transition::status_names(from, to));
            assert_eq!(
                EventClassifier::default().classify(&event).relevant,
                expected,
                "{from} -> {to}"
            );
        }
    }

    #[test]
    fn test_only_status_items_count() {
        let event = IncomingEvent::new(EventKind::Updated, "ABC-1")
            .with_current_status("Done", Some("done"))
            .with_transition(Transition {
                field: "assignee".to_string(),
                ..Default::default()
            });
        let result = EventClassifier::default().classify(&event);
        assert_eq!(result, Classification::ignored(Reason::NoStatusChange));
    }

    #[test]
    fn test_any_completing_item_fires() {
        let event = IncomingEvent::new(EventKind::Updated, "ABC-1")
            .with_transition(Transition::status("To Do", "new", "In Progress", "indeterminate"))
            .with_transition(Transition::status("In Progress", "indeterminate", "Done", "done"));
        assert!(EventClassifier::default().classify(&event).relevant);
    }

    #[test]
    fn test_missing_history_falls_back_to_current_status() {
        let done = IncomingEvent::new(EventKind::Updated, "ABC-1")
            .with_current_status("Shipped", Some("done"));
        assert_eq!(
            EventClassifier::default().classify(&done),
            Classification::relevant(Reason::CurrentStatusDone)
        );

        let by_name = IncomingEvent::new(EventKind::Updated, "ABC-1")
            .with_current_status("Completed", None);
        assert!(EventClassifier::default().classify(&by_name).relevant);

        let open = IncomingEvent::new(EventKind::Updated, "ABC-1")
            .with_current_status("In Progress", Some("indeterminate"));
        assert_eq!(
            EventClassifier::default().classify(&open),
            Classification::ignored(Reason::CurrentStatusNotDone)
        );
    }

    #[test]
    fn test_empty_history_is_same_as_missing() {
        let mut event = IncomingEvent::new(EventKind::Updated, "ABC-1")
            .with_current_status("Done", None);
        event.transition_history = Some(Vec::new());
        assert_eq!(
            EventClassifier::default().classify(&event).reason,
            Reason::CurrentStatusDone
        );
    }

    #[test]
    fn test_history_only_classifier_defers_to_default() {
        let classifier = EventClassifier::new(vec![Box::new(TransitionHistorySignal)]);
        let event = IncomingEvent::new(EventKind::Updated, "ABC-1")
            .with_current_status("Done", Some("done"));
        assert_eq!(classifier.classify(&event).reason, Reason::NotCompleted);
        assert_eq!(classifier.signal_names(), vec!["transition_history"]);
    }

    #[test]
    fn test_is_done_name() {
        assert!(is_done_name(" Done "));
        assert!(is_done_name("COMPLETED"));
        assert!(!is_done_name("Not Done"));
        assert!(!is_done_name("In Progress"));
    }
}
