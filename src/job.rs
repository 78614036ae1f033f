//! One invocation of the batch job: ingest, then summarize the target date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::ingest::types::HeadlineSource;
use crate::ingest::{run_once, PipelinePolicy, RunReport, RunStatus};
use crate::sentiment::SentimentAnalyzer;
use crate::store::HeadlineStore;
use crate::summary::{summarize, summarize_window, SummaryOutcome, SummaryPolicy, WindowSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failed,
}

/// Always produced, even when the run fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub status: JobStatus,
    pub ingest: RunReport,
    pub ingest_status: RunStatus,
    pub target_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowSummary>,
}

impl JobReport {
    pub fn exit_code(&self) -> i32 {
        match self.status {
            JobStatus::Success => 0,
            JobStatus::Failed => 1,
        }
    }
}

pub struct JobContext<'a> {
    pub source: &'a dyn HeadlineSource,
    pub store: &'a dyn HeadlineStore,
    pub analyzer: &'a SentimentAnalyzer,
    pub pipeline: PipelinePolicy,
    pub summary: SummaryPolicy,
}

/// Ingest, then summarize `target_date`. The summarizer is skipped when the
/// source was unreachable.
pub async fn run_job(ctx: &JobContext<'_>, target_date: NaiveDate, now: DateTime<Utc>) -> JobReport {
    let ingest = run_once(ctx.source, ctx.store, ctx.analyzer, &ctx.pipeline).await;
    let ingest_status = ingest.status(&ctx.pipeline);

    let mut report = JobReport {
        status: JobStatus::Success,
        ingest,
        ingest_status,
        target_date,
        summary: None,
        summary_error: None,
        window: None,
    };

    if ingest_status == RunStatus::SourceUnavailable {
        report.status = JobStatus::Failed;
        return report;
    }
    if ingest_status == RunStatus::PersistenceFailed {
        tracing::error!(
            failures = report.ingest.persistence_failures,
            "persistence failures crossed the run threshold"
        );
        report.status = JobStatus::Failed;
    }

    match summarize(ctx.store, target_date).await {
        Ok(outcome) => {
            tracing::info!(date = %target_date, outcome = outcome.label(), "summarizer finished");
            report.summary = Some(outcome);
        }
        Err(e) => {
            tracing::error!(error = %e, date = %target_date, "summarizer failed");
            report.summary_error = Some(e.to_string());
            report.status = JobStatus::Failed;
        }
    }

    match summarize_window(ctx.store, now, ctx.summary.window_hours).await {
        Ok(Some(w)) => {
            tracing::info!(
                hours = w.period_hours,
                total = w.total_headlines,
                average_sentiment = w.average_sentiment,
                "rolling sentiment"
            );
            report.window = Some(w);
        }
        Ok(None) => tracing::info!(hours = ctx.summary.window_hours, "no recent headlines"),
        Err(e) => tracing::warn!(error = %e, "rolling window summary unavailable"),
    }

    report
}
