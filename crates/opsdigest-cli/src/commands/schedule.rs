use std::time::Duration;

use tracing::{error, info, warn};

use opsdigest_core::{due_at, next_trigger, report_title, FailureReport, RunOptions};

use crate::error::CliError;

use super::Pipeline;

/// Runs every report on its trigger until Ctrl-C.
///
/// Due reports run one after another, each in its own task. A run that panics
/// is escalated as an unhandled failure and the loop carries on.
pub async fn run(pipeline: &Pipeline, options: &RunOptions) -> Result<(), CliError> {
    info!("scheduler started");
    loop {
        let now = pipeline.clock.now();
        let (trigger, at) = next_trigger(now)?;
        let wait = Duration::try_from(at - now).unwrap_or(Duration::ZERO);
        info!(
            trigger = trigger.kind().as_str(),
            cron = trigger.cron(),
            at = %at,
            wait_secs = wait.as_secs(),
            "waiting for next trigger"
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            signal = tokio::signal::ctrl_c() => {
                if let Err(error) = signal {
                    warn!(%error, "could not listen for Ctrl-C");
                }
                info!("scheduler stopped");
                return Ok(());
            }
        }

        for due in due_at(at)? {
            let kind = due.kind();
            let runner = pipeline.runner.clone();
            let options = options.clone();
            let handle = tokio::spawn(async move { runner.run(kind, &options).await });

            match handle.await {
                Ok(Ok(summary)) => info!(
                    run_id = %summary.run_id,
                    kind = kind.as_str(),
                    period = %summary.period.label,
                    "scheduled report finished"
                ),
                Ok(Err(failure)) => warn!(
                    run_id = %failure.run_id,
                    kind = kind.as_str(),
                    stage = %failure.stage,
                    "scheduled report failed"
                ),
                Err(join_error) => {
                    error!(kind = kind.as_str(), error = %join_error, "scheduled report aborted");
                    let report = FailureReport::new(
                        "Erro Não Tratado",
                        format!("A execução agendada de {} foi interrompida.", report_title(kind)),
                    )
                    .with_error(&join_error)
                    .with_context("tipo", report_title(kind));
                    pipeline.reporter.report(report).await;
                }
            }
        }
    }
}
