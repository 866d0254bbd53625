use serde::Serialize;

use opsdigest_core::{LocalDate, PeriodKind, RunOptions, RunSummary, SummaryCounts};

use crate::error::CliError;

use super::{print_json, Pipeline};

#[derive(Debug, Serialize)]
struct ReportOutput {
    run_id: String,
    kind: PeriodKind,
    label: String,
    start: LocalDate,
    end: LocalDate,
    counts: SummaryCounts,
    production_records: usize,
    artifact: Option<String>,
    notifications: NotificationCounts,
}

#[derive(Debug, Serialize)]
struct NotificationCounts {
    sent: usize,
    skipped: usize,
    failed: usize,
}

impl From<&RunSummary> for ReportOutput {
    fn from(summary: &RunSummary) -> Self {
        Self {
            run_id: summary.run_id.to_string(),
            kind: summary.period.kind,
            label: summary.period.label.clone(),
            start: summary.period.start,
            end: summary.period.end,
            counts: summary.counts,
            production_records: summary.production_records,
            artifact: summary
                .artifact
                .as_ref()
                .map(|artifact| artifact.path().display().to_string()),
            notifications: NotificationCounts {
                sent: summary.notify.sent(),
                skipped: summary.notify.skipped(),
                failed: summary.notify.failed(),
            },
        }
    }
}

pub async fn run(
    pipeline: &Pipeline,
    kind: PeriodKind,
    options: &RunOptions,
    pretty: bool,
) -> Result<(), CliError> {
    let summary = pipeline.runner.run(kind, options).await?;
    print_json(&ReportOutput::from(&summary), pretty)
}
