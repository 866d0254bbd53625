mod cli;
mod commands;
mod error;

use std::process::ExitCode;

use clap::Parser;
use opsdigest_core::CalendarConfig;
use time::UtcOffset;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

fn main() -> ExitCode {
    // stdout carries JSON results; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let calendar = CalendarConfig::from_env()?;

    // The local offset can only be read reliably while the process is
    // single-threaded, so resolve it before the runtime starts.
    let offset = match calendar.utc_offset {
        Some(offset) => offset,
        None => UtcOffset::current_local_offset().unwrap_or_else(|_| {
            warn!("could not determine the local UTC offset, using UTC");
            UtcOffset::UTC
        }),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(commands::run(&cli, calendar.locale, offset))
}
