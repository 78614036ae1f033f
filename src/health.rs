//! Store health snapshot for the `health` command.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::store::{HeadlineStore, StoreError, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_headline_at: Option<DateTime<Utc>>,
    pub total_headlines: u64,
    pub total_summaries: u64,
    pub headlines_24h: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

/// Never fails: store errors are folded into an `error` status.
pub async fn health_status(store: &dyn HeadlineStore, now: DateTime<Utc>) -> HealthStatus {
    match snapshot(store, now).await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            HealthStatus {
                status: HealthState::Error,
                last_headline_at: None,
                total_headlines: 0,
                total_summaries: 0,
                headlines_24h: 0,
                timestamp: now,
                error: Some(e.to_string()),
            }
        }
    }
}

async fn snapshot(store: &dyn HeadlineStore, now: DateTime<Utc>) -> Result<HealthStatus, StoreError> {
    let recent = store
        .query_headlines(TimeRange::trailing(now, Duration::hours(24)))
        .await?;
    let counts = store.counts().await?;
    Ok(HealthStatus {
        status: HealthState::Healthy,
        last_headline_at: recent.last().map(|r| r.observed_at),
        total_headlines: counts.headlines,
        total_summaries: counts.summaries,
        headlines_24h: recent.len() as u64,
        timestamp: now,
        error: None,
    })
}
