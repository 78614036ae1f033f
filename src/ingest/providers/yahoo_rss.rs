// src/ingest/providers/yahoo_rss.rs
use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::{HeadlineSource, RawHeadline};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
}

/// Filters applied to every feed item before it becomes a headline.
#[derive(Debug, Clone)]
pub struct FeedFilter {
    /// Case-insensitive; an empty list keeps everything.
    pub keywords: Vec<String>,
    pub min_chars: usize,
}

impl FeedFilter {
    pub fn keeps(&self, text: &str) -> bool {
        if text.chars().count() < self.min_chars {
            return false;
        }
        if self.keywords.is_empty() {
            return true;
        }
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .any(|k| !k.trim().is_empty() && lower.contains(&k.trim().to_lowercase()))
    }
}

pub struct YahooRssSource {
    mode: Mode,
    feed_url: String,
    label: String,
    filter: FeedFilter,
    observed_at: Option<DateTime<Utc>>,
}

enum Mode {
    // Own copy of the document so tests need no 'static data.
    Fixture(String),
    Http(reqwest::Client),
}

impl YahooRssSource {
    /// Conventional Yahoo Finance headline feed for a ticker.
    pub fn feed_url_for(ticker: &str) -> String {
        format!(
            "https://feeds.finance.yahoo.com/rss/2.0/headline?s={}&region=US&lang=en-US",
            ticker.trim().to_ascii_uppercase()
        )
    }

    pub fn from_url(
        feed_url: impl Into<String>,
        label: impl Into<String>,
        filter: FeedFilter,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http(client),
            feed_url: feed_url.into(),
            label: label.into(),
            filter,
            observed_at: None,
        })
    }

    pub fn from_fixture(xml: &str, label: impl Into<String>, filter: FeedFilter) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
            feed_url: "fixture://yahoo_rss".to_string(),
            label: label.into(),
            filter,
            observed_at: None,
        }
    }

    /// Pin the capture timestamp instead of reading the clock.
    pub fn with_observed_at(mut self, ts: DateTime<Utc>) -> Self {
        self.observed_at = Some(ts);
        self
    }

    fn parse_items_from_str(&self, s: &str, observed_at: DateTime<Utc>) -> Result<Vec<RawHeadline>> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(s).context("parsing yahoo rss xml")?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let text = normalize_text(it.title.as_deref().unwrap_or_default());
            if text.is_empty() || !self.filter.keeps(&text) {
                continue;
            }
            if !seen.insert(text.clone()) {
                continue;
            }
            tracing::debug!(headline = %text, "feed item matched");
            out.push(RawHeadline {
                text,
                source_label: self.label.clone(),
                source_url: it
                    .link
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .or_else(|| Some(self.feed_url.clone())),
                observed_at,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl HeadlineSource for YahooRssSource {
    async fn fetch(&self) -> Result<Vec<RawHeadline>> {
        let observed_at = self.observed_at.unwrap_or_else(Utc::now);
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s, observed_at),
            Mode::Http(client) => {
                tracing::info!(url = %self.feed_url, "fetching headline feed");
                let resp = client
                    .get(&self.feed_url)
                    .send()
                    .await
                    .context("yahoo http get()")?;
                let status = resp.status();
                if !status.is_success() {
                    bail!("yahoo feed returned status {status}");
                }
                let body = resp.text().await.context("yahoo http .text()")?;
                self.parse_items_from_str(&body, observed_at)
            }
        }
    }

    fn name(&self) -> &str {
        "yahoo_rss"
    }
}
