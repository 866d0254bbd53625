//! CLI argument definitions for opsdigest.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `daily` | Report the previous day (or `--date`) |
//! | `weekly` | Report Monday to Friday of last week |
//! | `monthly` | Report the previous calendar month |
//! | `schedule` | Run every report on its trigger until interrupted |
//! | `period` | Print the period a report would cover, without fetching |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--output-dir` | `OPSDIGEST_OUTPUT_DIR` or `.` | Where spreadsheets are written |
//! | `--no-notify` | `false` | Render only, skip email and messaging |
//! | `--keep-artifact` | `false` | Leave the spreadsheet on disk after the run |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! # Yesterday's report, delivered to the configured readers
//! opsdigest daily
//!
//! # Rebuild a given day locally without sending anything
//! opsdigest daily --date 2024-05-01 --no-notify --keep-artifact --output-dir /tmp
//!
//! # Check which week the weekly report would cover
//! opsdigest period weekly --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use opsdigest_core::{LocalDate, PeriodKind};

/// Operations-center digests: daily, weekly and monthly summaries of broker
/// production, claims and urgent tickets.
#[derive(Debug, Parser)]
#[command(
    name = "opsdigest",
    author,
    version,
    about = "Operations-center report digests",
    long_about = "opsdigest aggregates broker production, claims and urgent service tickets \
for a reporting period, renders them into a spreadsheet and delivers a summary by e-mail \
and chat.\n\
\n\
Configuration is read from OPSDIGEST_* environment variables.\n\
\n\
Use 'opsdigest <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Directory for rendered spreadsheets. Overrides OPSDIGEST_OUTPUT_DIR.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Render the report without sending it anywhere.
    #[arg(long, global = true, default_value_t = false)]
    pub no_notify: bool,

    /// Keep the spreadsheet on disk after the run.
    #[arg(long, global = true, default_value_t = false)]
    pub keep_artifact: bool,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Report the previous day.
    ///
    /// # Examples
    ///
    ///   opsdigest daily
    ///   opsdigest daily --date 2024-05-01
    Daily(DailyArgs),

    /// Report Monday to Friday of the previous week.
    Weekly,

    /// Report the previous calendar month.
    Monthly,

    /// Run every report on its trigger until interrupted.
    ///
    /// Daily: 06:00 Tuesday to Saturday. Weekly: Saturday 06:15.
    /// Monthly: 06:00 on the first. All in OPSDIGEST_UTC_OFFSET.
    Schedule,

    /// Print the period a report would cover as JSON.
    Period(PeriodArgs),
}

/// Arguments for the `daily` command.
#[derive(Debug, Args)]
pub struct DailyArgs {
    /// Report this date (YYYY-MM-DD) instead of yesterday.
    #[arg(long)]
    pub date: Option<LocalDate>,
}

/// Arguments for the `period` command.
#[derive(Debug, Args)]
pub struct PeriodArgs {
    /// Report cadence.
    #[arg(value_enum)]
    pub kind: KindArg,
}

/// Report cadence selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Daily,
    Weekly,
    Monthly,
}

impl From<KindArg> for PeriodKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Daily => Self::Daily,
            KindArg::Weekly => Self::Weekly,
            KindArg::Monthly => Self::Monthly,
        }
    }
}
