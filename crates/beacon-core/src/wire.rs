//! Webhook body decoding.
//!
//! Two payload shapes are accepted:
//! - the normalized [`IncomingEvent`] JSON (camelCase, `eventKind` present)
//! - a Jira-style delivery (`webhookEvent`, `issue.fields`, optional `changelog`)
//!
//! Both end up as an [`IncomingEvent`]; nothing downstream inspects raw JSON.

use crate::error::{CoreError, Result};
use crate::event::{EventKind, IncomingEvent, IssueDetails, Transition};
use serde::Deserialize;
use serde_json::Value;

/// Payload shapes accepted on the webhook endpoint.
///
/// Note: with `#[serde(untagged)]` variants are tried in order; the normalized
/// shape requires `eventKind` so Jira deliveries fall through to the second variant.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WebhookPayload {
    Normalized(IncomingEvent),
    Jira(JiraWebhook),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraWebhook {
    pub webhook_event: String,
    pub issue: JiraIssue,
    #[serde(default)]
    pub changelog: Option<JiraChangelog>,
}

#[derive(Debug, Deserialize)]
pub struct JiraIssue {
    #[serde(default)]
    pub id: Option<String>,
    pub key: String,
    #[serde(default)]
    pub fields: JiraFields,
}

#[derive(Debug, Default, Deserialize)]
pub struct JiraFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<JiraStatus>,
    #[serde(default)]
    pub priority: Option<JiraNamed>,
    #[serde(default)]
    pub issuetype: Option<JiraNamed>,
    #[serde(default)]
    pub components: Vec<JiraNamed>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraStatus {
    pub name: String,
    #[serde(default)]
    pub status_category: Option<JiraStatusCategory>,
}

#[derive(Debug, Deserialize)]
pub struct JiraStatusCategory {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct JiraNamed {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct JiraChangelog {
    #[serde(default)]
    pub items: Vec<JiraChangeItem>,
}

/// Changelog item; the category fields are an extension some relays add.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraChangeItem {
    pub field: String,
    #[serde(default, rename = "fromString")]
    pub from_name: Option<String>,
    #[serde(default, rename = "toString")]
    pub to_name: Option<String>,
    #[serde(default)]
    pub from_status_category: Option<String>,
    #[serde(default)]
    pub to_status_category: Option<String>,
}

impl From<JiraWebhook> for IncomingEvent {
    fn from(hook: JiraWebhook) -> Self {
        let event_kind = match hook.webhook_event.as_str() {
            "jira:issue_created" => EventKind::Created,
            "jira:issue_updated" => EventKind::Updated,
            "jira:issue_deleted" => EventKind::Deleted,
            _ => EventKind::Other,
        };

        let fields = hook.issue.fields;
        let (current_status, current_status_category) = match fields.status {
            Some(status) => (Some(status.name), status.status_category.map(|c| c.key)),
            None => (None, None),
        };

        // An absent changelog stays `None` so the classifier takes the fallback path.
        let transition_history = hook.changelog.map(|log| {
            log.items
                .into_iter()
                .map(|item| Transition {
                    field: item.field,
                    from_status: item.from_name,
                    to_status: item.to_name,
                    from_status_category: item.from_status_category,
                    to_status_category: item.to_status_category,
                })
                .collect()
        });

        Self {
            event_kind,
            issue_key: hook.issue.key,
            issue_id: hook.issue.id,
            current_status,
            current_status_category,
            transition_history,
            issue: IssueDetails {
                summary: fields.summary.unwrap_or_default(),
                description: fields.description,
                priority: fields.priority.map(|p| p.name),
                issue_type: fields.issuetype.map(|t| t.name),
                components: fields.components.into_iter().map(|c| c.name).collect(),
                labels: fields.labels,
            },
        }
    }
}

impl From<WebhookPayload> for IncomingEvent {
    fn from(payload: WebhookPayload) -> Self {
        match payload {
            WebhookPayload::Normalized(event) => event,
            WebhookPayload::Jira(hook) => hook.into(),
        }
    }
}

/// Decode and validate a webhook body.
///
/// # Errors
/// Returns `CoreError::InvalidPayload` if the body matches neither shape or has
/// an empty issue key.
pub fn decode_webhook(body: Value) -> Result<IncomingEvent> {
    let payload: WebhookPayload = serde_json::from_value(body)
        .map_err(|e| CoreError::InvalidPayload(e.to_string()))?;
    let event = IncomingEvent::from(payload);

    if event.issue_key.trim().is_empty() {
        return Err(CoreError::InvalidPayload("issue key is empty".to_string()));
    }

    Ok(event)
}
