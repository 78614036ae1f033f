// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod health;
pub mod ingest;
pub mod job;
pub mod metrics;
pub mod sentiment;
pub mod store;
pub mod summary;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::ingest::types::{HeadlineSource, IngestError, RawHeadline};
pub use crate::ingest::{normalize_text, run_once, PipelinePolicy, RunReport, RunStatus};
pub use crate::job::{run_job, JobContext, JobReport};
pub use crate::sentiment::{classify, Classification, SentimentAnalyzer, SentimentScores};
pub use crate::store::{HeadlineStore, MemoryStore, SqliteStore, StoreError};
pub use crate::summary::{summarize, SummaryOutcome};
