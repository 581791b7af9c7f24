//! Category selection for derived records.
//!
//! Strategies are tried in order; the first success wins. The keyword
//! strategy never fails, so a chain ending with it always produces a
//! category.

use crate::config::AiConfig;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use beacon_core::rules::keyword_category;
use beacon_core::{Category, IssueDetails};
use beacon_notify::config::configured;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You classify completed software work items for a product changelog. \
Reply with exactly one word: Added, Fixed, Improved, Security or Deprecated.";

/// One way of choosing a record category.
#[async_trait]
pub trait CategoryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn categorize(&self, issue: &IssueDetails) -> Result<Category>;
}

/// Deterministic keyword rules over summary and description.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordCategoryStrategy;

#[async_trait]
impl CategoryStrategy for KeywordCategoryStrategy {
    fn name(&self) -> &'static str {
        "keywords"
    }

    async fn categorize(&self, issue: &IssueDetails) -> Result<Category> {
        Ok(keyword_category(&issue.summary, issue.description.as_deref()))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Asks a messages-API model for the category.
#[derive(Debug, Clone)]
pub struct AiCategoryStrategy {
    client: Client,
    config: AiConfig,
    api_key: String,
}

impl AiCategoryStrategy {
    /// Build the strategy if an API key is configured.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>> {
        let Some(api_key) = configured(config.api_key.as_deref()) else {
            return Ok(None);
        };

        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Some(Self {
            client,
            config: config.clone(),
            api_key: api_key.to_string(),
        }))
    }

    fn prompt(issue: &IssueDetails) -> String {
        let mut prompt = format!("Summary: {}", issue.summary);
        if let Some(description) = issue.description.as_deref().filter(|d| !d.trim().is_empty()) {
            prompt.push_str("\n\nDescription:\n");
            prompt.push_str(description);
        }
        if let Some(issue_type) = &issue.issue_type {
            prompt.push_str("\n\nIssue type: ");
            prompt.push_str(issue_type);
        }
        prompt
    }
}

/// First word of the reply that names a category.
fn parse_reply(text: &str) -> Option<Category> {
    text.split_whitespace().find_map(|word| word.parse().ok())
}

#[async_trait]
impl CategoryStrategy for AiCategoryStrategy {
    fn name(&self) -> &'static str {
        "ai"
    }

    async fn categorize(&self, issue: &IssueDetails) -> Result<Category> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: Self::prompt(issue),
            }],
        };

        debug!(model = %self.config.model, "Requesting AI category");

        let response = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Ai(format!("HTTP {status}")));
        }

        let body: MessagesResponse = response.json().await?;
        let text: String = body
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text.as_deref())
            .collect();

        parse_reply(&text).ok_or_else(|| IngestError::Ai(format!("unrecognized reply: {text:?}")))
    }
}

/// Ordered list of strategies.
pub struct CategoryChain {
    strategies: Vec<Box<dyn CategoryStrategy>>,
}

impl CategoryChain {
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn CategoryStrategy>>) -> Self {
        Self { strategies }
    }

    /// AI first when configured, keywords last.
    ///
    /// # Errors
    /// Returns error if the AI client cannot be constructed.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let mut strategies: Vec<Box<dyn CategoryStrategy>> = Vec::new();
        if let Some(ai) = AiCategoryStrategy::from_config(config)? {
            strategies.push(Box::new(ai));
        }
        strategies.push(Box::new(KeywordCategoryStrategy));
        Ok(Self::new(strategies))
    }

    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// # Errors
    /// Returns `IngestError::Category` if every strategy fails.
    pub async fn categorize(&self, issue: &IssueDetails) -> Result<Category> {
        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.categorize(issue).await {
                Ok(category) => {
                    debug!(strategy = strategy.name(), %category, "Category chosen");
                    return Ok(category);
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Category strategy failed, trying next");
                    failures.push(format!("{}: {e}", strategy.name()));
                }
            }
        }
        Err(IngestError::Category(failures.join("; ")))
    }
}

impl Default for CategoryChain {
    fn default() -> Self {
        Self::new(vec![Box::new(KeywordCategoryStrategy)])
    }
}
