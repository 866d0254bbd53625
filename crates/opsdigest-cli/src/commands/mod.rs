mod period;
mod report;
mod schedule;

use std::process::ExitCode;
use std::sync::Arc;

use opsdigest_core::{
    AppConfig, BrokerApi, Clock, EmailChannel, EmailFailureReporter, FailureReporter, HttpClient,
    HttpGatewayConnector, HttpRecordSource, Locale, LogFailureReporter, Mailer, MessagingChannel,
    Notifier, PeriodKind, ReportRunner, ReqwestHttpClient, RunOptions, SmtpMailer, SystemClock,
    TicketScanner,
};
use serde::Serialize;
use time::UtcOffset;
use tracing::{info, warn};

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Live collaborators for report runs.
#[derive(Clone)]
pub struct Pipeline {
    pub runner: ReportRunner,
    pub reporter: Arc<dyn FailureReporter>,
    pub clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn build(cli: &Cli, config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, CliError> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

        let source = HttpRecordSource::new(
            BrokerApi::new(http.clone(), clock.clone(), config.broker.clone()),
            TicketScanner::new(http.clone(), config.tickets.clone()),
        );

        let (reporter, mut notifier) = match &config.mail {
            Some(mail) => {
                let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(mail)?);
                let reporter: Arc<dyn FailureReporter> =
                    Arc::new(EmailFailureReporter::new(mailer.clone(), mail.clone()));
                let notifier = Notifier::new(reporter.clone())
                    .with_channel(Arc::new(EmailChannel::new(mailer, mail.clone())));
                (reporter, notifier)
            }
            None => {
                warn!("mail is not configured: no e-mail channel, failures are only logged");
                let reporter: Arc<dyn FailureReporter> = Arc::new(LogFailureReporter);
                (reporter.clone(), Notifier::new(reporter))
            }
        };

        if let Some(messaging) = &config.messaging {
            let connector = HttpGatewayConnector::new(http, messaging.gateway.clone());
            notifier = notifier.with_channel(Arc::new(MessagingChannel::new(
                Arc::new(connector),
                messaging.channel.clone(),
            )));
        }
        info!(channels = ?notifier.channel_names(), "notification channels configured");

        let output_dir = cli
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone());
        let runner = ReportRunner::new(Arc::new(source), notifier, reporter.clone(), clock.clone())
            .with_locale(config.calendar.locale)
            .with_output_dir(output_dir);

        Ok(Self {
            runner,
            reporter,
            clock,
        })
    }
}

pub async fn run(cli: &Cli, locale: Locale, offset: UtcOffset) -> Result<ExitCode, CliError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(offset));

    if let Command::Period(args) = &cli.command {
        period::run(args, clock.as_ref(), locale, cli.pretty)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = AppConfig::from_env()?;
    let pipeline = Pipeline::build(cli, &config, clock)?;
    let options = run_options(cli);

    match &cli.command {
        Command::Daily(args) => {
            let options = match args.date {
                Some(date) => options.on_date(date),
                None => options,
            };
            report::run(&pipeline, PeriodKind::Daily, &options, cli.pretty).await?;
        }
        Command::Weekly => report::run(&pipeline, PeriodKind::Weekly, &options, cli.pretty).await?,
        Command::Monthly => report::run(&pipeline, PeriodKind::Monthly, &options, cli.pretty).await?,
        Command::Schedule => schedule::run(&pipeline, &options).await?,
        Command::Period(_) => {}
    }

    Ok(ExitCode::SUCCESS)
}

fn run_options(cli: &Cli) -> RunOptions {
    let mut options = RunOptions::new();
    if cli.no_notify {
        options = options.without_notify();
    }
    if cli.keep_artifact {
        options = options.keeping_artifact();
    }
    options
}

pub fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
