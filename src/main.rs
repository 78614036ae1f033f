//! Headline Sentiment: binary entrypoint.
//! Batch job: fetch ticker headlines, score and store them, then roll the
//! target date into a daily summary. Also hosts the maintenance commands.

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Days, Utc};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use headline_sentiment::cli::{Cli, Command};
use headline_sentiment::config::AppConfig;
use headline_sentiment::health::health_status;
use headline_sentiment::ingest::providers::yahoo_rss::YahooRssSource;
use headline_sentiment::ingest::retention::purge_expired;
use headline_sentiment::job::{run_job, JobContext};
use headline_sentiment::metrics::Metrics;
use headline_sentiment::sentiment::SentimentAnalyzer;
use headline_sentiment::store::{HeadlineStore, SqliteStore};
use headline_sentiment::summary::yesterday;

/// RUST_LOG wins; otherwise `--debug` / HEADLINES_DEBUG=1 turn on crate
/// debug logs. Logs go to stderr, stdout carries the JSON report.
fn init_tracing(debug: bool) {
    let debug = debug
        || std::env::var("HEADLINES_DEBUG")
            .ok()
            .is_some_and(|v| v == "1");
    let default = if debug {
        "headline_sentiment=debug,info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let json = std::env::var("HEADLINES_LOG_FORMAT")
        .unwrap_or_default()
        .eq_ignore_ascii_case("json");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    // Usage errors exit with status 2 from inside clap.
    let command = Cli::parse().into_command();

    init_tracing(command.common().debug);

    match run(command).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = ?e, "job aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<u8> {
    let cfg = match &command.common().config {
        Some(p) => AppConfig::load_from(p)?,
        None => AppConfig::load_default()?,
    };

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder not installed");
            None
        }
    };

    let store = SqliteStore::open(&cfg.database_path)
        .with_context(|| format!("opening store at {}", cfg.database_path.display()))?;
    let now = Utc::now();

    let code = match command {
        Command::Run(args) => {
            let source = YahooRssSource::from_url(
                cfg.feed_url(),
                cfg.source_label.clone(),
                cfg.feed_filter(),
                cfg.http_timeout(),
                &cfg.user_agent,
            )?;
            let analyzer = SentimentAnalyzer::new();
            let ctx = JobContext {
                source: &source,
                store: &store,
                analyzer: &analyzer,
                pipeline: cfg.pipeline_policy(),
                summary: cfg.summary_policy(),
            };
            let target = args.date.unwrap_or_else(|| yesterday(now));
            tracing::info!(ticker = %cfg.ticker, target_date = %target, "job started");
            let report = run_job(&ctx, target, now).await;
            print_json(&report)?;
            report.exit_code()
        }
        Command::Cleanup(_) => {
            let report = purge_expired(&store, &cfg.retention_policy(), now).await?;
            print_json(&report)?;
            0
        }
        Command::Health(_) => {
            let status = health_status(&store, now).await;
            print_json(&status)?;
            if status.is_healthy() {
                0
            } else {
                1
            }
        }
        Command::Summaries(args) => {
            let since = u64::try_from(args.days)
                .ok()
                .and_then(|d| now.date_naive().checked_sub_days(Days::new(d)))
                .with_context(|| format!("--days {} reaches before the earliest date", args.days))?;
            let rows = store.list_summaries(since).await?;
            print_json(&rows)?;
            0
        }
    };

    if let (Some(m), Some(path)) = (&metrics, &cfg.metrics_textfile) {
        if let Err(e) = m.write_textfile(path) {
            tracing::warn!(error = %e, path = %path.display(), "metrics textfile not written");
        }
    }

    Ok(code as u8)
}
