use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::sentiment::{Classification, SentimentScores};

/// A scored headline about to be persisted; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHeadline {
    pub text: String,
    pub source: String,
    pub source_url: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub classification: Classification,
}

impl NewHeadline {
    /// Attach scores; the classification is always derived from `compound`.
    pub fn scored(
        text: String,
        source: String,
        source_url: Option<String>,
        observed_at: DateTime<Utc>,
        scores: SentimentScores,
    ) -> Self {
        Self {
            text,
            source,
            source_url,
            observed_at,
            compound: scores.compound,
            positive: scores.positive,
            negative: scores.negative,
            neutral: scores.neutral,
            classification: scores.classification(),
        }
    }
}

/// One observed, scored, persisted headline. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineRecord {
    pub id: i64,
    pub text: String,
    pub source: String,
    pub source_url: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub classification: Classification,
}

impl HeadlineRecord {
    pub fn from_new(id: i64, new: NewHeadline) -> Self {
        Self {
            id,
            text: new.text,
            source: new.source,
            source_url: new.source_url,
            observed_at: new.observed_at,
            compound: new.compound,
            positive: new.positive,
            negative: new.negative,
            neutral: new.neutral,
            classification: new.classification,
        }
    }
}

/// One aggregate per calendar date; `date` is the unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummaryRecord {
    pub date: NaiveDate,
    pub total: u32,
    pub positive_count: u32,
    pub negative_count: u32,
    pub neutral_count: u32,
    pub avg_sentiment: f64,
    pub most_positive_text: String,
    pub most_positive_score: f64,
    pub most_negative_text: String,
    pub most_negative_score: f64,
}

/// Closed interval `[start, end]` over `observed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The trailing window of length `window` that ends at `end`. A window
    /// reaching past the earliest representable instant starts there.
    pub fn trailing(end: DateTime<Utc>, window: chrono::Duration) -> Self {
        Self {
            start: end
                .checked_sub_signed(window)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Row counts used by the health report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub headlines: u64,
    pub summaries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn trailing_range_is_closed_on_both_ends() {
        let end = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let r = TimeRange::trailing(end, Duration::hours(24));
        assert!(r.contains(end));
        assert!(r.contains(end - Duration::hours(24)));
        assert!(!r.contains(end - Duration::hours(24) - Duration::seconds(1)));
        assert!(!r.contains(end + Duration::microseconds(1)));
    }

    #[test]
    fn oversized_window_saturates_instead_of_overflowing() {
        let end = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let r = TimeRange::trailing(end, Duration::hours(10_000_000_000));
        assert_eq!(r.start, DateTime::<Utc>::MIN_UTC);
        assert!(r.contains(end - Duration::days(365 * 1000)));
    }

    #[test]
    fn scored_derives_classification_from_compound() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let scores = SentimentScores {
            compound: -0.05,
            positive: 0.0,
            negative: 0.2,
            neutral: 0.8,
        };
        let h = NewHeadline::scored("x".into(), "feed".into(), None, ts, scores);
        assert_eq!(h.classification, Classification::Negative);
    }
}
