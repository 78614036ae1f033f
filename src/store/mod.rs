//! # Store
//! Durable record storage behind a single async interface. The pipeline,
//! the summarizer, the retention job and the health report all depend on
//! [`HeadlineStore`] only, never on a concrete database client.
//!
//! Contract shared by every implementation:
//! - headline queries return records ordered by `(observed_at, id)`;
//! - `insert_summary` rejects a second summary for the same date with
//!   [`StoreError::UniqueViolation`];
//! - stored records are never mutated in place.

pub mod memory;
mod migrations;
pub mod models;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

pub use memory::MemoryStore;
pub use models::{DailySummaryRecord, HeadlineRecord, NewHeadline, StoreCounts, TimeRange};
pub use sqlite::SqliteStore;

/// Errors raised by a [`HeadlineStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key already exists (e.g. a summary for that date).
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other integrity rule rejected the write.
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store I/O failure: {0}")]
    Io(String),

    /// A stored row could not be decoded back into a record.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

#[async_trait]
pub trait HeadlineStore: Send + Sync {
    /// Persist one headline and return its assigned id.
    async fn insert_headline(&self, record: NewHeadline) -> Result<i64, StoreError>;

    /// All headlines whose `observed_at` lies in the closed `range`.
    async fn query_headlines(&self, range: TimeRange) -> Result<Vec<HeadlineRecord>, StoreError>;

    async fn summary_exists(&self, date: NaiveDate) -> Result<bool, StoreError>;

    async fn insert_summary(&self, record: DailySummaryRecord) -> Result<(), StoreError>;

    /// Summaries dated on or after `since`, newest first.
    async fn list_summaries(&self, since: NaiveDate)
        -> Result<Vec<DailySummaryRecord>, StoreError>;

    /// Delete headlines observed strictly before `cutoff`; returns the count.
    async fn delete_headlines_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Delete summaries dated strictly before `cutoff`; returns the count.
    async fn delete_summaries_older_than(&self, cutoff: NaiveDate) -> Result<u64, StoreError>;

    async fn counts(&self) -> Result<StoreCounts, StoreError>;
}
