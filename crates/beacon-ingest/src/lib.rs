//! beacon-ingest: From issue-tracker webhook to pending changelog record.
//!
//! This crate provides:
//! - `DedupGuard`: fail-open lookup of already-processed issue keys
//! - `CategoryChain`: AI-first, keyword-fallback category selection
//! - `RecordBuilder`: customer-facing record construction
//! - `ChangelogPipeline`: the end-to-end flow and its webhook response

pub mod builder;
pub mod category;
pub mod config;
pub mod dedup;
pub mod error;
pub mod pipeline;

pub use builder::RecordBuilder;
pub use category::{AiCategoryStrategy, CategoryChain, CategoryStrategy, KeywordCategoryStrategy};
pub use config::{AiConfig, IngestConfig};
pub use dedup::DedupGuard;
pub use error::{IngestError, Result};
pub use pipeline::{ChangelogPipeline, PipelineOutcome, WebhookResponse};
