//! Output formatting for the CLI.

use anyhow::Result;
use beacon_core::{
    Classification, DeliveryLogEntry, DerivedRecord, IncomingEvent, Reason, RecipientPreference,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<Option<String>> {
    Ok(match format {
        OutputFormat::Human => None,
        OutputFormat::Json => Some(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Some(serde_yaml::to_string(value)?),
    })
}

/// Print output in the specified format.
pub fn print<T: Serialize + HumanDisplay>(value: &T, format: OutputFormat) -> Result<()> {
    match render(value, format)? {
        Some(text) => println!("{text}"),
        None => println!("{}", value.human_display()),
    }
    Ok(())
}

/// Print a list in the specified format.
pub fn print_list<T: Serialize + HumanDisplay>(values: &[T], format: OutputFormat) -> Result<()> {
    match render(values, format)? {
        Some(text) => println!("{text}"),
        None if values.is_empty() => println!("Nothing to show."),
        None => {
            for value in values {
                println!("{}", value.human_display());
            }
        }
    }
    Ok(())
}

/// Print records as a table with dynamic column widths.
pub fn print_record_list(records: &[DerivedRecord], format: OutputFormat) -> Result<()> {
    match render(records, format)? {
        Some(text) => println!("{text}"),
        None => print!("{}", record_table(records)),
    }
    Ok(())
}

fn record_table(records: &[DerivedRecord]) -> String {
    if records.is_empty() {
        return "No records found.\n".to_string();
    }

    let key_width = records.iter().map(|r| r.source_key.len()).max().unwrap_or(3).max(3);
    let category_width = records
        .iter()
        .map(|r| r.category.as_str().len())
        .max()
        .unwrap_or(8)
        .max(8);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<key_w$}  {:<cat_w$}  {:<8}  TITLE",
        "KEY",
        "CATEGORY",
        "PRIORITY",
        key_w = key_width,
        cat_w = category_width
    );
    let _ = writeln!(out, "{}", "-".repeat(key_width + category_width + 20));

    for record in records {
        let _ = writeln!(
            out,
            "{:<key_w$}  {:<cat_w$}  {:<8}  {}",
            record.source_key,
            record.category.as_str(),
            record.priority.as_str(),
            record.customer_title,
            key_w = key_width,
            cat_w = category_width
        );
    }
    out
}

/// Print a success message.
pub fn print_success(message: &str, format: OutputFormat) -> Result<()> {
    #[derive(Serialize)]
    struct Success<'a> {
        status: &'static str,
        message: &'a str,
    }

    match render(&Success { status: "ok", message }, format)? {
        Some(text) => println!("{text}"),
        None => println!("{message}"),
    }
    Ok(())
}

/// Result of `beacon classify`.
#[derive(Debug, Serialize)]
pub struct ClassificationView {
    pub issue_key: String,
    pub event_kind: String,
    pub relevant: bool,
    pub reason: Reason,
    pub message: &'static str,
}

impl ClassificationView {
    pub fn new(event: &IncomingEvent, classification: Classification) -> Self {
        Self {
            issue_key: event.issue_key.clone(),
            event_kind: event.event_kind.to_string(),
            relevant: classification.relevant,
            reason: classification.reason,
            message: classification.reason.message(),
        }
    }
}

/// Trait for human-readable display.
pub trait HumanDisplay {
    fn human_display(&self) -> String;
}

impl HumanDisplay for ClassificationView {
    fn human_display(&self) -> String {
        let verdict = if self.relevant { "relevant" } else { "ignored" };
        format!(
            "{} ({}): {verdict}\n  {}",
            self.issue_key, self.event_kind, self.message
        )
    }
}

impl HumanDisplay for DeliveryLogEntry {
    fn human_display(&self) -> String {
        let mut out = format!(
            "[{}] {} {} {:?} -> {}",
            format_time(&self.logged_at),
            self.notification_type,
            self.priority,
            self.subject,
            if self.success { "ok" } else { "FAILED" }
        );
        if let Some(error) = &self.error {
            let _ = write!(out, "\n  rejected: {error}");
        }
        for result in &self.results {
            let _ = write!(
                out,
                "\n  {:<8} reached={} {}",
                result.channel.as_str(),
                result.recipients_reached,
                result.detail
            );
        }
        out
    }
}

impl HumanDisplay for RecipientPreference {
    fn human_display(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "User:       {}", self.user_id);
        if let Some(email) = &self.email {
            let _ = writeln!(out, "Email:      {email}");
        }
        if let Some(phone) = &self.phone {
            let _ = writeln!(out, "Phone:      {phone}");
        }
        let _ = writeln!(out, "Threshold:  {}", self.priority_threshold);

        let channels: Vec<String> = beacon_core::Channel::ALL
            .iter()
            .filter(|c| self.channel_enabled(**c))
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(out, "Channels:   {}", channels.join(", "));

        let mut disabled: Vec<String> = self
            .types
            .iter()
            .filter(|(_, on)| !**on)
            .map(|(t, _)| t.to_string())
            .collect();
        if !disabled.is_empty() {
            disabled.sort();
            let _ = writeln!(out, "Muted:      {}", disabled.join(", "));
        }

        if self.quiet_hours.enabled {
            let _ = writeln!(
                out,
                "Quiet:      {}-{} ({})",
                self.quiet_hours.start, self.quiet_hours.end, self.quiet_hours.timezone
            );
        }

        out
    }
}

fn format_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{Category, Channel, EventClassifier, EventKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_table_aligns_columns() {
        let mut short = DerivedRecord::new("A-1", Category::Fixed);
        short.customer_title = "Fixed login".to_string();
        let mut long = DerivedRecord::new("PLATFORM-1234", Category::Security);
        long.customer_title = "Hardened tokens".to_string();

        let table = record_table(&[short, long]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("KEY            CATEGORY"));
        assert_eq!(lines[2].find("Fixed"), lines[3].find("Security"));
    }

    #[test]
    fn test_empty_record_table() {
        assert_eq!(record_table(&[]), "No records found.\n");
    }

    #[test]
    fn test_preference_lists_enabled_channels() {
        let preference = RecipientPreference::default_for("u1")
            .with_channel(Channel::Slack, false)
            .with_email("u1@example.com");
        let text = preference.human_display();

        assert!(text.contains("Email:      u1@example.com"));
        assert!(text.contains("Channels:   email, webhook, in_app"));
    }

    #[test]
    fn test_classification_view_message() {
        let event = IncomingEvent::new(EventKind::Created, "ABC-9");
        let view = ClassificationView::new(&event, EventClassifier::default().classify(&event));
        assert!(!view.relevant);
        assert!(view.human_display().starts_with("ABC-9"));
    }
}
