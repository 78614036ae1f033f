// src/ingest/mod.rs
//! Ingestion pipeline: Source → Validate → Dedup → Score → Store, one
//! headline at a time. Per-headline failures are counted and never abort
//! the batch; only a source failure fails the run outright.

pub mod dedup;
pub mod providers;
pub mod retention;
pub mod types;

use std::time::Instant;

use chrono::Duration;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::ingest::dedup::is_duplicate;
use crate::ingest::types::{HeadlineSource, IngestError, ItemOutcome, RawHeadline};
use crate::sentiment::SentimentAnalyzer;
use crate::store::{HeadlineStore, NewHeadline};

/// Default trailing dedup window.
pub const DEFAULT_DEDUP_WINDOW_HOURS: i64 = 24;
/// Stored headline length cap, in characters.
pub const MAX_HEADLINE_CHARS: usize = 1000;

/// One-time metrics registration (so series show up in the exposition).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("headlines_fetched_total", "Headlines returned by the source.");
        describe_counter!("headlines_inserted_total", "Headlines scored and persisted.");
        describe_counter!(
            "headlines_duplicate_total",
            "Headlines skipped by the dedup window."
        );
        describe_counter!(
            "headlines_failed_total",
            "Headlines rejected by validation or persistence."
        );
        describe_counter!("ingest_source_errors_total", "Source fetch/parse errors.");
        describe_histogram!("ingest_run_ms", "Ingest run duration in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when the ingest pipeline last ran.");
    });
}

/// Normalize text: decode entities, strip tags, fold quotes, collapse
/// whitespace, cap length. Trailing punctuation is kept (it carries
/// emphasis for the scorer); see [`dedup::dedup_key`] for comparison.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| {
        regex::Regex::new(r"(?is)</?[a-z!][^>]*>").expect("static tag regex")
    });
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    out = out.split_whitespace().collect::<Vec<_>>().join(" ");

    // 5) Length cap
    if out.chars().count() > MAX_HEADLINE_CHARS {
        out = out.chars().take(MAX_HEADLINE_CHARS).collect();
    }

    out
}

/// Named policy constants for one ingest run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelinePolicy {
    pub dedup_window: Duration,
    /// Share of persistence attempts that, when failed, fails the run.
    /// `1.0` means only a run where every write failed.
    pub persistence_failure_threshold: f64,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            dedup_window: Duration::hours(DEFAULT_DEDUP_WINDOW_HOURS),
            persistence_failure_threshold: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    SourceUnavailable,
    PersistenceFailed,
}

/// Counters of one run; always produced, even on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub fetched: usize,
    pub inserted: usize,
    pub skipped_duplicate: usize,
    /// Validation plus persistence failures.
    pub failed: usize,
    pub persistence_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
}

impl RunReport {
    pub fn status(&self, policy: &PipelinePolicy) -> RunStatus {
        if self.source_error.is_some() {
            return RunStatus::SourceUnavailable;
        }
        let attempts = self.inserted + self.persistence_failures;
        if attempts > 0 {
            let ratio = self.persistence_failures as f64 / attempts as f64;
            if ratio >= policy.persistence_failure_threshold {
                return RunStatus::PersistenceFailed;
            }
        }
        RunStatus::Completed
    }
}

/// Validate, dedup, score and persist a single headline.
pub async fn process_headline(
    raw: RawHeadline,
    store: &dyn HeadlineStore,
    analyzer: &SentimentAnalyzer,
    policy: &PipelinePolicy,
) -> Result<ItemOutcome, IngestError> {
    let text = normalize_text(&raw.text);
    if text.is_empty() {
        return Err(IngestError::Validation(
            "headline text is empty after normalization".into(),
        ));
    }
    let source = raw.source_label.trim();
    if source.is_empty() {
        return Err(IngestError::Validation("headline has no source label".into()));
    }

    if is_duplicate(store, &text, raw.observed_at, policy.dedup_window).await? {
        return Ok(ItemOutcome::Duplicate);
    }

    let scores = analyzer.score(&text);
    let record = NewHeadline::scored(
        text,
        source.to_string(),
        raw.source_url,
        raw.observed_at,
        scores,
    );
    let id = store.insert_headline(record).await?;
    Ok(ItemOutcome::Inserted(id))
}

/// Run ingest once: fetch from `source`, then process every headline in
/// source order.
pub async fn run_once(
    source: &dyn HeadlineSource,
    store: &dyn HeadlineStore,
    analyzer: &SentimentAnalyzer,
    policy: &PipelinePolicy,
) -> RunReport {
    ensure_metrics_described();
    let t0 = Instant::now();
    let mut report = RunReport::default();

    let raw = match source.fetch().await {
        Ok(v) => v,
        Err(e) => {
            let err = IngestError::SourceUnavailable(e);
            tracing::error!(error = %err, source = source.name(), "source fetch failed");
            counter!("ingest_source_errors_total").increment(1);
            report.source_error = Some(err.to_string());
            record_run_metrics(&report, t0);
            return report;
        }
    };
    report.fetched = raw.len();
    tracing::info!(source = source.name(), fetched = report.fetched, "fetched headlines");

    for item in raw {
        let preview = preview(&item.text);
        match process_headline(item, store, analyzer, policy).await {
            Ok(ItemOutcome::Inserted(id)) => {
                report.inserted += 1;
                tracing::debug!(id, headline = %preview, "headline stored");
            }
            Ok(ItemOutcome::Duplicate) => {
                report.skipped_duplicate += 1;
                tracing::debug!(headline = %preview, "duplicate headline skipped");
            }
            Err(e @ IngestError::Validation(_)) => {
                report.failed += 1;
                tracing::warn!(error = %e, headline = %preview, "headline rejected");
            }
            Err(e) => {
                report.failed += 1;
                report.persistence_failures += 1;
                tracing::warn!(error = %e, headline = %preview, "headline not persisted");
            }
        }
    }

    record_run_metrics(&report, t0);
    tracing::info!(
        fetched = report.fetched,
        inserted = report.inserted,
        skipped_duplicate = report.skipped_duplicate,
        failed = report.failed,
        "ingest run finished"
    );
    report
}

fn record_run_metrics(report: &RunReport, t0: Instant) {
    counter!("headlines_fetched_total").increment(report.fetched as u64);
    counter!("headlines_inserted_total").increment(report.inserted as u64);
    counter!("headlines_duplicate_total").increment(report.skipped_duplicate as u64);
    counter!("headlines_failed_total").increment(report.failed as u64);
    histogram!("ingest_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
}

/// First 50 characters, for log lines.
pub(crate) fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(50).collect();
    if text.chars().count() > 50 {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_keeps_punct() {
        let s = "  Hello,&nbsp;&nbsp; world!!!  ";
        let out = normalize_text(s);
        assert_eq!(out, "Hello, world!!!");
    }

    #[test]
    fn normalize_text_keeps_comparison_operators() {
        assert_eq!(normalize_text("EPS > estimates"), "EPS > estimates");
    }

    #[test]
    fn status_reflects_threshold() {
        let policy = PipelinePolicy::default();
        let mut r = RunReport {
            fetched: 3,
            inserted: 0,
            failed: 3,
            persistence_failures: 3,
            ..Default::default()
        };
        assert_eq!(r.status(&policy), RunStatus::PersistenceFailed);

        r.inserted = 1;
        r.persistence_failures = 2;
        assert_eq!(r.status(&policy), RunStatus::Completed);

        let strict = PipelinePolicy {
            persistence_failure_threshold: 0.5,
            ..policy
        };
        assert_eq!(r.status(&strict), RunStatus::PersistenceFailed);
    }

    #[test]
    fn validation_only_failures_do_not_fail_the_run() {
        let r = RunReport {
            fetched: 2,
            failed: 2,
            ..Default::default()
        };
        assert_eq!(r.status(&PipelinePolicy::default()), RunStatus::Completed);
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(80);
        assert_eq!(preview(&long).chars().count(), 53);
        assert_eq!(preview("short"), "short");
    }
}
