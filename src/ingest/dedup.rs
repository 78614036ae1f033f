//! Trailing-window duplicate detection against the store.
//!
//! Two headlines are the same when their [`dedup_key`]s match: normalized
//! text, trailing sentence punctuation removed, lower-cased.

use chrono::{DateTime, Duration, Utc};

use crate::ingest::normalize_text;
use crate::store::{HeadlineStore, StoreError, TimeRange};

/// Comparison key for duplicate detection.
pub fn dedup_key(s: &str) -> String {
    let mut out = normalize_text(s);
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',' | ';' | ':') {
            out.pop();
        } else {
            break;
        }
    }
    out.trim_end().to_lowercase()
}

/// True when a headline with the same key was observed within `window`
/// before (or at) `observed_at`. Read-only.
pub async fn is_duplicate(
    store: &dyn HeadlineStore,
    text: &str,
    observed_at: DateTime<Utc>,
    window: Duration,
) -> Result<bool, StoreError> {
    let key = dedup_key(text);
    let recent = store
        .query_headlines(TimeRange::trailing(observed_at, window))
        .await?;
    Ok(recent.iter().any(|r| dedup_key(&r.text) == key))
}
