// src/config.rs
//! Application configuration: TOML or JSON file, then env overrides.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::providers::yahoo_rss::{FeedFilter, YahooRssSource};
use crate::ingest::retention::RetentionPolicy;
use crate::ingest::PipelinePolicy;
use crate::summary::SummaryPolicy;

pub const ENV_CONFIG_PATH: &str = "HEADLINES_CONFIG_PATH";
pub const ENV_DATABASE_PATH: &str = "HEADLINES_DATABASE_PATH";
pub const ENV_FEED_URL: &str = "HEADLINES_FEED_URL";
pub const ENV_METRICS_TEXTFILE: &str = "HEADLINES_METRICS_TEXTFILE";

const DEFAULT_TOML: &str = "config/headlines.toml";
const DEFAULT_JSON: &str = "config/headlines.json";

/// Upper bound for the hour-based windows (one leap year).
pub const MAX_WINDOW_HOURS: i64 = 24 * 366;
/// Upper bound for the retention windows (a century).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ticker: String,
    pub source_label: String,
    /// Derived from `ticker` when unset.
    pub feed_url: Option<String>,
    pub keywords: Vec<String>,
    pub min_headline_chars: usize,
    pub database_path: PathBuf,
    pub dedup_window_hours: i64,
    pub persistence_failure_threshold: f64,
    pub headline_retention_days: i64,
    pub summary_retention_days: i64,
    pub summary_window_hours: i64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub metrics_textfile: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ticker: "PLTR".into(),
            source_label: "yahoo_finance".into(),
            feed_url: None,
            keywords: ["palantir", "pltr", "karp", "foundry", "gotham", "aip"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_headline_chars: 11,
            database_path: PathBuf::from("data/headlines.db"),
            dedup_window_hours: 24,
            persistence_failure_threshold: 1.0,
            headline_retention_days: 30,
            summary_retention_days: 90,
            summary_window_hours: 1,
            http_timeout_secs: 30,
            user_agent: concat!("headline-sentiment/", env!("CARGO_PKG_VERSION")).into(),
            metrics_textfile: None,
        }
    }
}

impl AppConfig {
    /// Load from an explicit path. Format is picked by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $HEADLINES_CONFIG_PATH
    /// 2) config/headlines.toml
    /// 3) config/headlines.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        for candidate in [DEFAULT_TOML, DEFAULT_JSON] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_nonempty(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = env_nonempty(ENV_FEED_URL) {
            self.feed_url = Some(v);
        }
        if let Some(v) = env_nonempty(ENV_METRICS_TEXTFILE) {
            self.metrics_textfile = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_label.trim().is_empty() {
            bail!("source_label must not be empty");
        }
        if self.ticker.trim().is_empty() && self.feed_url.is_none() {
            bail!("either ticker or feed_url must be set");
        }
        for (name, v, max) in [
            ("dedup_window_hours", self.dedup_window_hours, MAX_WINDOW_HOURS),
            ("summary_window_hours", self.summary_window_hours, MAX_WINDOW_HOURS),
            ("headline_retention_days", self.headline_retention_days, MAX_RETENTION_DAYS),
            ("summary_retention_days", self.summary_retention_days, MAX_RETENTION_DAYS),
        ] {
            if !(1..=max).contains(&v) {
                bail!("{name} must be in 1..={max} (got {v})");
            }
        }
        let t = self.persistence_failure_threshold;
        if !(t > 0.0 && t <= 1.0) {
            bail!("persistence_failure_threshold must be in (0, 1] (got {t})");
        }
        if self.http_timeout_secs == 0 {
            bail!("http_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn feed_url(&self) -> String {
        self.feed_url
            .clone()
            .unwrap_or_else(|| YahooRssSource::feed_url_for(&self.ticker))
    }

    pub fn feed_filter(&self) -> FeedFilter {
        FeedFilter {
            keywords: self.keywords.clone(),
            min_chars: self.min_headline_chars,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn pipeline_policy(&self) -> PipelinePolicy {
        PipelinePolicy {
            dedup_window: chrono::Duration::hours(self.dedup_window_hours),
            persistence_failure_threshold: self.persistence_failure_threshold,
        }
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            headline_retention: chrono::Duration::days(self.headline_retention_days),
            summary_retention_days: self.summary_retention_days,
        }
    }

    pub fn summary_policy(&self) -> SummaryPolicy {
        SummaryPolicy {
            window_hours: self.summary_window_hours,
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        // Unknown extension: JSON documents start with a brace.
        _ if s.trim_start().starts_with('{') => Ok(serde_json::from_str(s)?),
        _ => Ok(toml::from_str(s)?),
    }
}
