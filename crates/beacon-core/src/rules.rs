//! Deterministic rules for turning an issue into customer-facing copy.

use crate::event::IssueDetails;
use crate::record::Category;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Ticket-id prefixes such as `ABC-123: `, `[ABC-123] ` or `ABC-123 - `.
static TICKET_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\[[A-Za-z][A-Za-z0-9]*-\d+\]|[A-Za-z][A-Za-z0-9]*-\d+)\s*(?:[:\-–]\s*)?")
        .expect("valid ticket prefix regex")
});

static JARGON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(api|ui|front-?end|back-?end|server)\b").expect("valid jargon regex")
});

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+?)\s*$").expect("valid list item regex")
});

/// Category keywords, checked in this order; a keyword matches any word that starts with it.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Added, &["new", "add", "create", "implement"]),
    (Category::Fixed, &["fix", "bug", "issue", "resolve"]),
    (Category::Security, &["security", "vulnerability", "auth"]),
    (Category::Deprecated, &["deprecat", "remove", "sunset"]),
];

/// Openings that already read as a benefit statement.
const BENEFIT_OPENERS: &[&str] = &["you can", "you'll", "now", "we've"];

const BREAKING_MARKERS: &[&str] = &["breaking", "deprecated", "removed"];

/// Base reach per component name (case-insensitive).
const COMPONENT_REACH: &[(&str, u32)] = &[
    ("frontend", 5000),
    ("authentication", 4000),
    ("dashboard", 3000),
    ("mobile", 2500),
    ("api", 2000),
    ("billing", 1500),
    ("reporting", 1200),
    ("integrations", 800),
    ("admin", 300),
];

pub const DEFAULT_REACH: u32 = 500;
const ENTERPRISE_FLOOR: u32 = 1000;
const BETA_CAP: u32 = 200;
const SENTENCE_HIGHLIGHTS: usize = 3;
const MIN_SENTENCE_LEN: usize = 10;

/// Replace internal jargon with customer vocabulary.
#[must_use]
pub fn replace_jargon(text: &str) -> String {
    JARGON
        .replace_all(text, |caps: &Captures<'_>| {
            match caps[1].to_ascii_lowercase().as_str() {
                "api" => "integration",
                "ui" | "frontend" | "front-end" => "interface",
                _ => "system",
            }
        })
        .into_owned()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Rewrite an issue summary as a customer-facing title.
#[must_use]
pub fn customer_title(summary: &str) -> String {
    let stripped = TICKET_PREFIX.replace(summary, "");
    capitalize(replace_jargon(stripped.trim()).trim())
}

fn opener(category: Category) -> &'static str {
    match category {
        Category::Added => "You can now take advantage of a new capability.",
        Category::Fixed => "We've fixed an issue so things work the way you expect.",
        Category::Improved => "We've made improvements to your experience.",
        Category::Security => "We've strengthened the security of your account and data.",
        Category::Deprecated => "Heads up: we're retiring functionality to keep the product focused.",
    }
}

/// First paragraph of the description that is not a list.
fn lead_paragraph(description: &str) -> Option<String> {
    description
        .split("\n\n")
        .map(|para| {
            para.lines()
                .filter(|line| !LIST_ITEM.is_match(line))
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .find(|para| !para.is_empty())
}

fn ensure_terminated(mut text: String) -> String {
    if !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    text
}

/// Build the customer-facing description, opening with a benefit statement.
#[must_use]
pub fn customer_description(category: Category, title: &str, description: Option<&str>) -> String {
    let Some(lead) = description.and_then(lead_paragraph) else {
        return format!("{} {}", opener(category), ensure_terminated(title.to_string()));
    };

    let lead = ensure_terminated(capitalize(&replace_jargon(&lead)));
    let lowered = lead.to_lowercase();
    if BENEFIT_OPENERS.iter().any(|o| lowered.starts_with(o)) {
        lead
    } else {
        format!("{} {lead}", opener(category))
    }
}

/// Highlights from list items, else the first few substantial sentences.
#[must_use]
pub fn extract_highlights(description: &str) -> Vec<String> {
    let listed: Vec<String> = description
        .lines()
        .filter_map(|line| LIST_ITEM.captures(line))
        .map(|caps| replace_jargon(&caps[1]))
        .collect();
    if !listed.is_empty() {
        return listed;
    }

    description
        .split(['.', '!', '?'])
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| s.chars().count() > MIN_SENTENCE_LEN)
        .take(SENTENCE_HIGHLIGHTS)
        .map(|s| replace_jargon(&s))
        .collect()
}

/// Whether the issue text signals a breaking change.
#[must_use]
pub fn has_breaking_changes(issue: &IssueDetails) -> bool {
    let combined = format!(
        "{} {} {}",
        issue.summary,
        issue.description.as_deref().unwrap_or_default(),
        issue.labels.join(" ")
    )
    .to_lowercase();
    BREAKING_MARKERS.iter().any(|m| combined.contains(m))
}

/// Estimate how many users a change reaches.
///
/// The broadest-reach component sizes the issue (maximum, not sum). Labels
/// then adjust it: `high-impact` doubles, `enterprise` floors at 1000 and
/// `beta` caps at 200, applied in that order.
#[must_use]
pub fn estimate_affected_users(components: &[String], labels: &[String]) -> u32 {
    let mut estimate = components
        .iter()
        .map(|component| {
            COMPONENT_REACH
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(component.trim()))
                .map_or(DEFAULT_REACH, |(_, reach)| *reach)
        })
        .max()
        .unwrap_or(DEFAULT_REACH);

    let has = |label: &str| labels.iter().any(|l| l.trim().eq_ignore_ascii_case(label));
    if has("high-impact") {
        estimate = estimate.saturating_mul(2);
    }
    if has("enterprise") {
        estimate = estimate.max(ENTERPRISE_FLOOR);
    }
    if has("beta") {
        estimate = estimate.min(BETA_CAP);
    }
    estimate
}

/// Keyword categorization over summary and description.
#[must_use]
pub fn keyword_category(summary: &str, description: Option<&str>) -> Category {
    let text = format!("{summary} {}", description.unwrap_or_default()).to_lowercase();
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|k| words.iter().any(|w| w.starts_with(*k)))
        })
        .map_or(Category::Improved, |(category, _)| *category)
}
