//! # Daily Summarizer
//! Rolls one calendar date of stored headlines into a single
//! [`DailySummaryRecord`], at most once per date. Also computes the
//! informational rolling-window summary logged at the end of a run.
//!
//! Dates are UTC calendar dates, the zone `observed_at` is stored in.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use metrics::counter;
use serde::Serialize;

use crate::sentiment::Classification;
use crate::store::{DailySummaryRecord, HeadlineRecord, HeadlineStore, StoreError, TimeRange};

/// Summary extreme texts are cut to this many characters.
pub const SUMMARY_TEXT_CHARS: usize = 500;

/// Result of one `summarize` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SummaryOutcome {
    Created { summary: DailySummaryRecord },
    AlreadyExists,
    NoData,
}

impl SummaryOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SummaryOutcome::Created { .. } => "created",
            SummaryOutcome::AlreadyExists => "already_exists",
            SummaryOutcome::NoData => "no_data",
        }
    }
}

/// The closed UTC interval covering `date`.
pub fn day_range(date: NaiveDate) -> TimeRange {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1) - Duration::microseconds(1);
    TimeRange::new(start, end)
}

/// Default target: the UTC date before `now`.
pub fn yesterday(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive() - Duration::days(1)
}

/// Aggregate one date's records. `None` for an empty set.
pub fn aggregate(date: NaiveDate, records: &[HeadlineRecord]) -> Option<DailySummaryRecord> {
    let first = records.first()?;

    let mut positive = 0u32;
    let mut negative = 0u32;
    let mut neutral = 0u32;
    let mut sum = 0.0f64;
    let mut best = first;
    let mut worst = first;

    for r in records {
        match r.classification {
            Classification::Positive => positive += 1,
            Classification::Negative => negative += 1,
            Classification::Neutral => neutral += 1,
        }
        sum += r.compound;
        // Ties go to the earliest observation.
        if r.compound > best.compound
            || (r.compound == best.compound && r.observed_at < best.observed_at)
        {
            best = r;
        }
        if r.compound < worst.compound
            || (r.compound == worst.compound && r.observed_at < worst.observed_at)
        {
            worst = r;
        }
    }

    let total = positive + negative + neutral;
    Some(DailySummaryRecord {
        date,
        total,
        positive_count: positive,
        negative_count: negative,
        neutral_count: neutral,
        avg_sentiment: round_to(sum / f64::from(total), 4),
        most_positive_text: truncate_chars(&best.text, SUMMARY_TEXT_CHARS),
        most_positive_score: round_to(best.compound, 4),
        most_negative_text: truncate_chars(&worst.text, SUMMARY_TEXT_CHARS),
        most_negative_score: round_to(worst.compound, 4),
    })
}

/// Create the summary for `target` unless one exists or there is no data.
/// A unique-date rejection from a concurrent run counts as `AlreadyExists`.
pub async fn summarize(
    store: &dyn HeadlineStore,
    target: NaiveDate,
) -> Result<SummaryOutcome, StoreError> {
    if store.summary_exists(target).await? {
        tracing::info!(date = %target, "daily summary already exists");
        return Ok(SummaryOutcome::AlreadyExists);
    }

    let records = store.query_headlines(day_range(target)).await?;
    let Some(summary) = aggregate(target, &records) else {
        tracing::info!(date = %target, "no headlines for date; summary skipped");
        return Ok(SummaryOutcome::NoData);
    };

    match store.insert_summary(summary.clone()).await {
        Ok(()) => {
            counter!("daily_summaries_created_total").increment(1);
            tracing::info!(
                date = %target,
                total = summary.total,
                avg_sentiment = summary.avg_sentiment,
                "daily summary created"
            );
            Ok(SummaryOutcome::Created { summary })
        }
        Err(e) if e.is_unique_violation() => {
            tracing::info!(date = %target, "daily summary created concurrently");
            Ok(SummaryOutcome::AlreadyExists)
        }
        Err(e) => Err(e),
    }
}

/// Width of the rolling window logged at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryPolicy {
    pub window_hours: i64,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self { window_hours: 1 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Distribution<T> {
    pub positive: T,
    pub negative: T,
    pub neutral: T,
}

/// Informational summary over the trailing `period_hours`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    pub timestamp: DateTime<Utc>,
    pub period_hours: i64,
    pub total_headlines: u32,
    pub distribution: Distribution<u32>,
    pub percentages: Distribution<f64>,
    pub average_sentiment: f64,
    pub most_positive_headline: String,
    pub most_positive_score: f64,
    pub most_negative_headline: String,
    pub most_negative_score: f64,
}

/// Rolling summary of the last `hours`; `None` when nothing was observed.
pub async fn summarize_window(
    store: &dyn HeadlineStore,
    now: DateTime<Utc>,
    hours: i64,
) -> Result<Option<WindowSummary>, StoreError> {
    let window = Duration::try_hours(hours).unwrap_or(Duration::MAX);
    let records = store
        .query_headlines(TimeRange::trailing(now, window))
        .await?;
    let Some(agg) = aggregate(now.date_naive(), &records) else {
        return Ok(None);
    };

    let pct = |n: u32| round_to(f64::from(n) / f64::from(agg.total) * 100.0, 1);
    Ok(Some(WindowSummary {
        timestamp: now,
        period_hours: hours,
        total_headlines: agg.total,
        distribution: Distribution {
            positive: agg.positive_count,
            negative: agg.negative_count,
            neutral: agg.neutral_count,
        },
        percentages: Distribution {
            positive: pct(agg.positive_count),
            negative: pct(agg.negative_count),
            neutral: pct(agg.neutral_count),
        },
        average_sentiment: agg.avg_sentiment,
        most_positive_headline: agg.most_positive_text,
        most_positive_score: agg.most_positive_score,
        most_negative_headline: agg.most_negative_text,
        most_negative_score: agg.most_negative_score,
    }))
}

fn round_to(x: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (x * f).round() / f
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(id: i64, compound: f64, ts: DateTime<Utc>) -> HeadlineRecord {
        HeadlineRecord {
            id,
            text: format!("headline {id}"),
            source: "test".into(),
            source_url: None,
            observed_at: ts,
            compound,
            positive: 0.0,
            negative: 0.0,
            neutral: 1.0,
            classification: crate::sentiment::classify(compound),
        }
    }

    #[test]
    fn day_range_covers_the_whole_date() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let r = day_range(d);
        assert!(r.contains(Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap()));
        assert!(r.contains(Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap()));
        assert!(!r.contains(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn yesterday_crosses_month_boundary() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 30, 0).unwrap();
        assert_eq!(yesterday(now), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn ties_prefer_earliest_observation() {
        let d = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        let t = Utc.with_ymd_and_hms(2025, 4, 2, 9, 0, 0).unwrap();
        // Later record listed first to make sure order is not what decides.
        let records = vec![
            rec(2, 0.7, t + Duration::hours(1)),
            rec(1, 0.7, t),
            rec(4, -0.3, t + Duration::hours(3)),
            rec(3, -0.3, t + Duration::hours(2)),
        ];
        let s = aggregate(d, &records).unwrap();
        assert_eq!(s.most_positive_text, "headline 1");
        assert_eq!(s.most_negative_text, "headline 3");
    }

    #[test]
    fn counts_sum_to_total_and_text_is_truncated() {
        let d = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        let t = Utc.with_ymd_and_hms(2025, 4, 2, 9, 0, 0).unwrap();
        let mut long = rec(1, 0.9, t);
        long.text = "y".repeat(800);
        let records = vec![long, rec(2, 0.01, t), rec(3, -0.2, t)];
        let s = aggregate(d, &records).unwrap();
        assert_eq!(s.total, 3);
        assert_eq!(s.positive_count + s.negative_count + s.neutral_count, s.total);
        assert_eq!(s.most_positive_text.chars().count(), SUMMARY_TEXT_CHARS);
        assert_eq!(s.avg_sentiment, 0.2367);
    }

    #[test]
    fn empty_set_has_no_summary() {
        let d = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        assert!(aggregate(d, &[]).is_none());
    }
}
