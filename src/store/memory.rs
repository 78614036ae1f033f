//! In-process store: mutex-guarded vectors that enforce the CHECK and UNIQUE
//! rules of the SQLite schema. Used by tests and by dry runs.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::models::{DailySummaryRecord, HeadlineRecord, NewHeadline, StoreCounts, TimeRange};
use super::{HeadlineStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    headlines: Vec<HeadlineRecord>,
    summaries: Vec<DailySummaryRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Snapshot of every stored headline in insertion order.
    pub fn headlines(&self) -> Vec<HeadlineRecord> {
        self.lock().headlines.clone()
    }

    /// Snapshot of every stored summary in insertion order.
    pub fn summaries(&self) -> Vec<DailySummaryRecord> {
        self.lock().summaries.clone()
    }
}

#[async_trait]
impl HeadlineStore for MemoryStore {
    async fn insert_headline(&self, record: NewHeadline) -> Result<i64, StoreError> {
        if record.text.trim().is_empty() {
            return Err(StoreError::ConstraintViolation(
                "headline text must not be empty".into(),
            ));
        }
        if !(-1.0..=1.0).contains(&record.compound) {
            return Err(StoreError::ConstraintViolation(format!(
                "compound {} outside [-1, 1]",
                record.compound
            )));
        }
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.headlines.push(HeadlineRecord::from_new(id, record));
        Ok(id)
    }

    async fn query_headlines(&self, range: TimeRange) -> Result<Vec<HeadlineRecord>, StoreError> {
        let inner = self.lock();
        let mut out: Vec<HeadlineRecord> = inner
            .headlines
            .iter()
            .filter(|h| range.contains(h.observed_at))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.observed_at.cmp(&b.observed_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn summary_exists(&self, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.lock().summaries.iter().any(|s| s.date == date))
    }

    async fn insert_summary(&self, record: DailySummaryRecord) -> Result<(), StoreError> {
        if record.total == 0 {
            return Err(StoreError::ConstraintViolation(
                "summary total must be positive".into(),
            ));
        }
        let counted = u64::from(record.positive_count)
            + u64::from(record.negative_count)
            + u64::from(record.neutral_count);
        if counted != u64::from(record.total) {
            return Err(StoreError::ConstraintViolation(format!(
                "class counts sum to {counted}, total is {}",
                record.total
            )));
        }
        let mut inner = self.lock();
        if inner.summaries.iter().any(|s| s.date == record.date) {
            return Err(StoreError::UniqueViolation(format!(
                "daily summary for {} already exists",
                record.date
            )));
        }
        inner.summaries.push(record);
        Ok(())
    }

    async fn list_summaries(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<DailySummaryRecord>, StoreError> {
        let mut out: Vec<DailySummaryRecord> = self
            .lock()
            .summaries
            .iter()
            .filter(|s| s.date >= since)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(out)
    }

    async fn delete_headlines_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let before = inner.headlines.len();
        inner.headlines.retain(|h| h.observed_at >= cutoff);
        Ok((before - inner.headlines.len()) as u64)
    }

    async fn delete_summaries_older_than(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let before = inner.summaries.len();
        inner.summaries.retain(|s| s.date >= cutoff);
        Ok((before - inner.summaries.len()) as u64)
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        let inner = self.lock();
        Ok(StoreCounts {
            headlines: inner.headlines.len() as u64,
            summaries: inner.summaries.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentScores;
    use chrono::{Duration, TimeZone};

    fn headline(text: &str, ts: DateTime<Utc>) -> NewHeadline {
        NewHeadline::scored(
            text.into(),
            "test".into(),
            None,
            ts,
            SentimentScores::neutral(),
        )
    }

    fn summary(date: NaiveDate) -> DailySummaryRecord {
        DailySummaryRecord {
            date,
            total: 1,
            positive_count: 0,
            negative_count: 0,
            neutral_count: 1,
            avg_sentiment: 0.0,
            most_positive_text: "x".into(),
            most_positive_score: 0.0,
            most_negative_text: "x".into(),
            most_negative_score: 0.0,
        }
    }

    #[tokio::test]
    async fn ids_are_sequential_and_queries_ordered() {
        let store = MemoryStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        let a = store.insert_headline(headline("late", t0 + Duration::hours(2))).await.unwrap();
        let b = store.insert_headline(headline("early", t0)).await.unwrap();
        assert_eq!((a, b), (1, 2));

        let got = store
            .query_headlines(TimeRange::new(t0, t0 + Duration::hours(2)))
            .await
            .unwrap();
        let texts: Vec<_> = got.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn empty_text_is_a_constraint_violation() {
        let store = MemoryStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        let err = store.insert_headline(headline("  ", t0)).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn summary_date_is_unique() {
        let store = MemoryStore::new();
        let d = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        store.insert_summary(summary(d)).await.unwrap();
        let err = store.insert_summary(summary(d)).await.unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(store.summaries().len(), 1);
    }

    #[tokio::test]
    async fn out_of_range_compound_is_rejected() {
        let store = MemoryStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        for compound in [1.5, -1.01, f64::NAN] {
            let mut h = headline("Palantir off the scale", t0);
            h.compound = compound;
            let err = store.insert_headline(h).await.unwrap_err();
            assert!(matches!(err, StoreError::ConstraintViolation(_)), "{compound}");
        }
        let mut edge = headline("Palantir at the edge", t0);
        edge.compound = -1.0;
        store.insert_headline(edge).await.unwrap();
        assert_eq!(store.headlines().len(), 1);
    }

    #[tokio::test]
    async fn summary_counts_must_add_up() {
        let store = MemoryStore::new();
        let d = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        let empty = DailySummaryRecord {
            total: 0,
            neutral_count: 0,
            ..summary(d)
        };
        let err = store.insert_summary(empty).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let lopsided = DailySummaryRecord {
            total: 3,
            positive_count: 1,
            ..summary(d)
        };
        let err = store.insert_summary(lopsided).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        assert!(store.summaries().is_empty());
        store.insert_summary(summary(d)).await.unwrap();
    }
}
