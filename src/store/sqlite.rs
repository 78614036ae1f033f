//! SQLite-backed [`HeadlineStore`]. One connection behind a mutex; every
//! call runs on the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, Row};
use tracing::{info, warn};

use super::migrations::run_migrations;
use super::models::{DailySummaryRecord, HeadlineRecord, NewHeadline, StoreCounts, TimeRange};
use super::{HeadlineStore, StoreError};
use crate::sentiment::Classification;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<Arc<PathBuf>>,
}

impl SqliteStore {
    /// Open (or create) the database file and bring its schema up to date.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let mut conn = Connection::open(&path)
            .with_context(|| format!("failed to open SQLite database {}", path.display()))?;

        if let Err(err) =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        {
            warn!(error = %err, "failed to enable WAL mode");
        }
        conn.busy_timeout(Duration::from_secs(5))
            .context("failed to set busy timeout")?;
        run_migrations(&mut conn).context("failed to run database migrations")?;

        info!(path = %path.display(), "database initialized");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(Arc::new(path)),
        })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let mut conn =
            Connection::open_in_memory().context("failed to open in-memory SQLite database")?;
        run_migrations(&mut conn).context("failed to run database migrations")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    async fn execute<F, T>(&self, task: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = match conn.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            task(&mut guard)
        })
        .await
        .map_err(|err| StoreError::Io(format!("database task terminated unexpectedly: {err}")))?
    }
}

/// Split SQLite constraint failures into unique-key and other violations.
fn map_write_error(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(e, msg) = &err {
        if e.code == ErrorCode::ConstraintViolation {
            let detail = msg.clone().unwrap_or_else(|| e.to_string());
            return match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    StoreError::UniqueViolation(detail)
                }
                _ => StoreError::ConstraintViolation(detail),
            };
        }
    }
    StoreError::Sqlite(err)
}

fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn from_micros(us: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp_micros(us)
        .ok_or_else(|| StoreError::Corrupt(format!("observed_at {us} out of range")))
}

fn parse_date(value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|err| StoreError::Corrupt(format!("invalid date '{value}': {err}")))
}

fn to_count(value: i64, field: &str) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("{field} contains invalid count {value}")))
}

fn row_to_headline(row: &Row) -> Result<HeadlineRecord, StoreError> {
    let classification: String = row.get("classification")?;
    Ok(HeadlineRecord {
        id: row.get("id")?,
        text: row.get("text")?,
        source: row.get("source")?,
        source_url: row.get("source_url")?,
        observed_at: from_micros(row.get("observed_at_us")?)?,
        compound: row.get("compound")?,
        positive: row.get("positive")?,
        negative: row.get("negative")?,
        neutral: row.get("neutral")?,
        classification: Classification::parse(&classification).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown classification '{classification}'"))
        })?,
    })
}

fn row_to_summary(row: &Row) -> Result<DailySummaryRecord, StoreError> {
    let date: String = row.get("date")?;
    Ok(DailySummaryRecord {
        date: parse_date(&date)?,
        total: to_count(row.get("total")?, "total")?,
        positive_count: to_count(row.get("positive_count")?, "positive_count")?,
        negative_count: to_count(row.get("negative_count")?, "negative_count")?,
        neutral_count: to_count(row.get("neutral_count")?, "neutral_count")?,
        avg_sentiment: row.get("avg_sentiment")?,
        most_positive_text: row.get("most_positive_text")?,
        most_positive_score: row.get("most_positive_score")?,
        most_negative_text: row.get("most_negative_text")?,
        most_negative_score: row.get("most_negative_score")?,
    })
}

#[async_trait]
impl HeadlineStore for SqliteStore {
    async fn insert_headline(&self, record: NewHeadline) -> Result<i64, StoreError> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO headlines (text, source, source_url, observed_at_us, compound, positive, negative, neutral, classification)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.text,
                    record.source,
                    record.source_url,
                    to_micros(record.observed_at),
                    record.compound,
                    record.positive,
                    record.negative,
                    record.neutral,
                    record.classification.as_str(),
                ],
            )
            .map_err(map_write_error)?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn query_headlines(&self, range: TimeRange) -> Result<Vec<HeadlineRecord>, StoreError> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, text, source, source_url, observed_at_us, compound, positive, negative, neutral, classification
                 FROM headlines
                 WHERE observed_at_us BETWEEN ?1 AND ?2
                 ORDER BY observed_at_us ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![to_micros(range.start), to_micros(range.end)])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(row_to_headline(row)?);
            }
            Ok(out)
        })
        .await
    }

    async fn summary_exists(&self, date: NaiveDate) -> Result<bool, StoreError> {
        self.execute(move |conn| {
            let found: i64 = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM daily_summaries WHERE date = ?1)",
                params![date.format(DATE_FORMAT).to_string()],
                |row| row.get(0),
            )?;
            Ok(found != 0)
        })
        .await
    }

    async fn insert_summary(&self, record: DailySummaryRecord) -> Result<(), StoreError> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO daily_summaries (date, total, positive_count, negative_count, neutral_count, avg_sentiment,
                                              most_positive_text, most_positive_score, most_negative_text, most_negative_score, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.date.format(DATE_FORMAT).to_string(),
                    i64::from(record.total),
                    i64::from(record.positive_count),
                    i64::from(record.negative_count),
                    i64::from(record.neutral_count),
                    record.avg_sentiment,
                    record.most_positive_text,
                    record.most_positive_score,
                    record.most_negative_text,
                    record.most_negative_score,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(map_write_error)?;
            Ok(())
        })
        .await
    }

    async fn list_summaries(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<DailySummaryRecord>, StoreError> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT date, total, positive_count, negative_count, neutral_count, avg_sentiment,
                        most_positive_text, most_positive_score, most_negative_text, most_negative_score
                 FROM daily_summaries
                 WHERE date >= ?1
                 ORDER BY date DESC",
            )?;

            let mut rows = stmt.query(params![since.format(DATE_FORMAT).to_string()])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(row_to_summary(row)?);
            }
            Ok(out)
        })
        .await
    }

    async fn delete_headlines_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.execute(move |conn| {
            let n = conn.execute(
                "DELETE FROM headlines WHERE observed_at_us < ?1",
                params![to_micros(cutoff)],
            )?;
            Ok(n as u64)
        })
        .await
    }

    async fn delete_summaries_older_than(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        self.execute(move |conn| {
            let n = conn.execute(
                "DELETE FROM daily_summaries WHERE date < ?1",
                params![cutoff.format(DATE_FORMAT).to_string()],
            )?;
            Ok(n as u64)
        })
        .await
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        self.execute(|conn| {
            let headlines: i64 =
                conn.query_row("SELECT COUNT(*) FROM headlines", [], |row| row.get(0))?;
            let summaries: i64 =
                conn.query_row("SELECT COUNT(*) FROM daily_summaries", [], |row| row.get(0))?;
            Ok(StoreCounts {
                headlines: headlines.max(0) as u64,
                summaries: summaries.max(0) as u64,
            })
        })
        .await
    }
}
