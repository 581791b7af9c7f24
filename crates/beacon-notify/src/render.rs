//! Per-channel message rendering.

use beacon_core::NotificationRequest;

/// Maximum length of a single SMS body, in characters.
pub const SMS_MAX_CHARS: usize = 160;

const EMAIL_FOOTER: &str =
    "You are receiving this because of your beacon notification preferences.";

/// Chat text: bold priority-tagged subject line, then the body.
#[must_use]
pub fn slack_text(request: &NotificationRequest) -> String {
    format!(
        "*[{}] {}*\n{}",
        request.priority.as_str().to_ascii_uppercase(),
        request.message.subject,
        request.message.body
    )
}

/// Plain-text email body with a preferences footer.
#[must_use]
pub fn email_text(request: &NotificationRequest) -> String {
    format!("{}\n\n--\n{EMAIL_FOOTER}", request.message.body)
}

/// `subject: body`, cut to [`SMS_MAX_CHARS`] characters.
#[must_use]
pub fn sms_text(request: &NotificationRequest) -> String {
    let text = format!("{}: {}", request.message.subject, request.message.body);
    if text.chars().count() <= SMS_MAX_CHARS {
        return text;
    }

    let mut truncated: String = text.chars().take(SMS_MAX_CHARS - 1).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{NotificationMessage, NotificationType, Priority};
    use pretty_assertions::assert_eq;

    fn request(body: &str) -> NotificationRequest {
        NotificationRequest::new(
            NotificationType::SystemAlert,
            Priority::Critical,
            ["u1"],
            NotificationMessage::new("Store down", body),
        )
    }

    #[test]
    fn test_slack_text() {
        assert_eq!(slack_text(&request("Writes failing")), "*[CRITICAL] Store down*\nWrites failing");
    }

    #[test]
    fn test_email_has_footer() {
        let text = email_text(&request("Writes failing"));
        assert!(text.starts_with("Writes failing\n\n--\n"));
        assert!(text.ends_with(EMAIL_FOOTER));
    }

    #[test]
    fn test_sms_truncation() {
        assert_eq!(sms_text(&request("short")), "Store down: short");

        let long = sms_text(&request(&"é".repeat(400)));
        assert_eq!(long.chars().count(), SMS_MAX_CHARS);
        assert!(long.ends_with('…'));
    }
}
