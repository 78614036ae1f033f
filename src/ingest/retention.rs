// src/ingest/retention.rs
//! Retention sweep. A maintenance operation run on its own cadence via the
//! `cleanup` command; the ingest run never calls it.

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::store::{HeadlineStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionPolicy {
    pub headline_retention: Duration,
    pub summary_retention_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            headline_retention: Duration::days(30),
            summary_retention_days: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub headlines_deleted: u64,
    pub summaries_deleted: u64,
}

/// Delete headlines and summaries that fell out of their retention windows.
pub async fn purge_expired(
    store: &dyn HeadlineStore,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<PurgeReport, StoreError> {
    let headline_cutoff = now
        .checked_sub_signed(policy.headline_retention)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let headlines_deleted = store.delete_headlines_older_than(headline_cutoff).await?;
    tracing::info!(cutoff = %headline_cutoff, deleted = headlines_deleted, "purged old headlines");

    let summary_cutoff = u64::try_from(policy.summary_retention_days)
        .ok()
        .and_then(|d| now.date_naive().checked_sub_days(Days::new(d)))
        .unwrap_or(NaiveDate::MIN);
    let summaries_deleted = store.delete_summaries_older_than(summary_cutoff).await?;
    tracing::info!(cutoff = %summary_cutoff, deleted = summaries_deleted, "purged old daily summaries");

    Ok(PurgeReport {
        headlines_deleted,
        summaries_deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentScores;
    use crate::store::{DailySummaryRecord, MemoryStore, NewHeadline};
    use chrono::{NaiveDate, TimeZone};

    fn summary(date: NaiveDate) -> DailySummaryRecord {
        DailySummaryRecord {
            date,
            total: 1,
            positive_count: 1,
            negative_count: 0,
            neutral_count: 0,
            avg_sentiment: 0.4,
            most_positive_text: "up".into(),
            most_positive_score: 0.4,
            most_negative_text: "up".into(),
            most_negative_score: 0.4,
        }
    }

    #[tokio::test]
    async fn drops_only_expired_rows() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2025, 9, 30, 12, 0, 0).unwrap();
        for (text, age_days) in [("old", 31), ("edge", 30), ("fresh", 1)] {
            store
                .insert_headline(NewHeadline::scored(
                    text.into(),
                    "test".into(),
                    None,
                    now - Duration::days(age_days),
                    SentimentScores::neutral(),
                ))
                .await
                .unwrap();
        }
        let today = now.date_naive();
        store.insert_summary(summary(today - Duration::days(91))).await.unwrap();
        store.insert_summary(summary(today - Duration::days(90))).await.unwrap();

        let report = purge_expired(&store, &RetentionPolicy::default(), now)
            .await
            .unwrap();
        assert_eq!(report.headlines_deleted, 1);
        assert_eq!(report.summaries_deleted, 1);

        let left: Vec<_> = store.headlines().into_iter().map(|h| h.text).collect();
        assert_eq!(left, vec!["edge".to_string(), "fresh".to_string()]);
        assert_eq!(store.summaries().len(), 1);
    }
}
