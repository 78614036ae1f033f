// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::store::StoreError;

/// One headline as supplied by a source, before validation and scoring.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawHeadline {
    pub text: String,
    pub source_label: String, // e.g. "yahoo_finance"
    pub source_url: Option<String>,
    pub observed_at: DateTime<Utc>, // capture time
}

#[async_trait::async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Fetch the current batch. An error fails the whole run.
    async fn fetch(&self) -> Result<Vec<RawHeadline>>;
    fn name(&self) -> &str;
}

/// Failure classes of one ingest run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source could not be reached or its payload not parsed.
    #[error("headline source unavailable: {0:#}")]
    SourceUnavailable(anyhow::Error),

    /// Empty or malformed headline; counted and skipped.
    #[error("invalid headline: {0}")]
    Validation(String),

    /// Store read/write failure for one headline; counted and skipped.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

/// What happened to one headline that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Inserted(i64),
    Duplicate,
}
