//! Command-line surface of the `headline-sentiment` binary.
//!
//! With no subcommand the binary runs the ingest job, so
//! `headline-sentiment --date 2025-06-01` and
//! `headline-sentiment run --date 2025-06-01` are the same invocation.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::MAX_RETENTION_DAYS;

const DEFAULT_SUMMARY_DAYS: i64 = 7;

#[derive(Parser, Debug)]
#[command(
    name = "headline-sentiment",
    version,
    about = "Fetch ticker headlines, score their sentiment and keep daily summaries",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ingest headlines, then summarize the target date (default)
    Run(RunArgs),
    /// Delete headlines and summaries past their retention windows
    Cleanup(CommonArgs),
    /// Report store health as JSON
    Health(CommonArgs),
    /// List recent daily summaries as JSON
    Summaries(SummariesArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonArgs {
    /// Enable crate debug logs
    #[arg(short = 'v', long)]
    pub debug: bool,

    /// Config file (TOML or JSON)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// UTC date to summarize; defaults to yesterday
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SummariesArgs {
    /// How many days back to list
    #[arg(
        long,
        default_value_t = DEFAULT_SUMMARY_DAYS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_RETENTION_DAYS)
    )]
    pub days: i64,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl Cli {
    /// The selected command; a bare invocation is `run`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Run(self.run))
    }
}

impl Command {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Command::Run(a) => &a.common,
            Command::Cleanup(c) | Command::Health(c) => c,
            Command::Summaries(a) => &a.common,
        }
    }
}
