//! One end-to-end report run.
//!
//! ```text
//! period ─▶ authenticate ─▶ summary (per day) ─▶ production ─▶ render ─▶ notify ─▶ cleanup
//! ```
//!
//! Any failure before notification aborts the run, is escalated through the
//! [`FailureReporter`] with the stage and period attached, and is returned to
//! the caller. Notification problems never abort (see [`Notifier`]).

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

use opsdigest_workbook::{render_workbook, Artifact};
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::RecordSource;
use crate::aggregator::{collect_summary, SummaryCounts};
use crate::calendar::{Clock, LocalDate, Locale, Period, PeriodKind};
use crate::error::ReportError;
use crate::failure::{FailureReport, FailureReporter};
use crate::notify::{report_title, Notifier, NotifyOutcome, ReportDigest};

/// Pipeline step a run was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Period,
    Authenticate,
    FetchSummary,
    FetchProduction,
    Render,
    Notify,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Period => "period",
            Self::Authenticate => "authenticate",
            Self::FetchSummary => "fetch_summary",
            Self::FetchProduction => "fetch_production",
            Self::Render => "render",
            Self::Notify => "notify",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal run error with the context needed to act on it.
#[derive(Debug, Error)]
#[error("{kind} report for {period_label} failed at {stage}: {source}")]
pub struct RunFailure {
    pub run_id: Uuid,
    pub kind: PeriodKind,
    pub stage: Stage,
    pub period_label: String,
    #[source]
    pub source: ReportError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Report this date instead of the clock-derived period (daily only).
    pub date: Option<LocalDate>,
    pub notify: bool,
    pub keep_artifact: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self {
            date: None,
            notify: true,
            keep_artifact: false,
        }
    }

    pub fn on_date(mut self, date: LocalDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn without_notify(mut self) -> Self {
        self.notify = false;
        self
    }

    pub fn keeping_artifact(mut self) -> Self {
        self.keep_artifact = true;
        self
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub period: Period,
    pub counts: SummaryCounts,
    pub production_records: usize,
    /// Present when the spreadsheet was kept on disk.
    pub artifact: Option<Artifact>,
    pub notify: NotifyOutcome,
}

/// Wires the source, renderer and notifier together.
#[derive(Clone)]
pub struct ReportRunner {
    source: Arc<dyn RecordSource>,
    notifier: Notifier,
    reporter: Arc<dyn FailureReporter>,
    clock: Arc<dyn Clock>,
    locale: Locale,
    output_dir: PathBuf,
}

impl ReportRunner {
    pub fn new(
        source: Arc<dyn RecordSource>,
        notifier: Notifier,
        reporter: Arc<dyn FailureReporter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            notifier,
            reporter,
            clock,
            locale: Locale::default(),
            output_dir: PathBuf::from("."),
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn period_for(&self, kind: PeriodKind, options: &RunOptions) -> Result<Period, ReportError> {
        match (kind, options.date) {
            (PeriodKind::Daily, Some(date)) => Ok(Period::single_day(date)),
            _ => Ok(Period::for_kind(kind, self.clock.as_ref(), self.locale)?),
        }
    }

    pub async fn run(&self, kind: PeriodKind, options: &RunOptions) -> Result<RunSummary, RunFailure> {
        let run_id = Uuid::new_v4();

        let period = match self.period_for(kind, options) {
            Ok(period) => period,
            Err(source) => {
                let failure = RunFailure {
                    run_id,
                    kind,
                    stage: Stage::Period,
                    period_label: report_title(kind).to_owned(),
                    source,
                };
                self.escalate(&failure).await;
                return Err(failure);
            }
        };

        let span = info_span!("report_run", %run_id, kind = %kind, period = %period.label);
        let outcome = self.run_period(run_id, &period, options).instrument(span).await;

        match outcome {
            Ok(summary) => Ok(summary),
            Err((stage, source)) => {
                let failure = RunFailure {
                    run_id,
                    kind,
                    stage,
                    period_label: period.label.clone(),
                    source,
                };
                error!(
                    %run_id,
                    stage = %failure.stage,
                    period = %failure.period_label,
                    error = %failure.source,
                    "report run failed"
                );
                self.escalate(&failure).await;
                Err(failure)
            }
        }
    }

    async fn run_period(
        &self,
        run_id: Uuid,
        period: &Period,
        options: &RunOptions,
    ) -> Result<RunSummary, (Stage, ReportError)> {
        info!(start = %period.start, end = %period.end, days = period.day_count(), "report run started");

        let token = self
            .source
            .authenticate()
            .await
            .map_err(|error| (Stage::Authenticate, error))?;

        let records = collect_summary(self.source.as_ref(), &token, period)
            .await
            .map_err(|error| (Stage::FetchSummary, error))?;

        let production = self
            .source
            .production_for_period(&token, period.start, period.end)
            .await
            .map_err(|error| (Stage::FetchProduction, error))?;
        info!(records = production.len(), "production fetched");

        let artifact = render_workbook(
            &production,
            &records.claims,
            &records.urgent_tickets,
            &period.artifact_label(),
            &self.output_dir,
        )
        .map_err(|error| (Stage::Render, ReportError::from(error)))?;
        info!(path = %artifact.path.display(), "spreadsheet rendered");

        let counts = records.counts();
        let digest = ReportDigest::new(period.clone(), counts);
        let notify = if options.notify {
            self.notifier.notify(&digest, &artifact).await
        } else {
            info!(stage = %Stage::Notify, "notification disabled for this run");
            NotifyOutcome::default()
        };

        let artifact = if options.keep_artifact {
            Some(artifact)
        } else {
            if let Err(error) = artifact.remove() {
                warn!(%error, path = %artifact.path.display(), "could not remove spreadsheet");
            }
            None
        };

        info!(
            transmissions = counts.transmissions,
            issued_policies = counts.issued_policies,
            claims = counts.claims,
            urgent_tickets = counts.urgent_tickets,
            delivered = notify.sent(),
            failed_channels = notify.failed(),
            "report run finished"
        );

        Ok(RunSummary {
            run_id,
            period: period.clone(),
            counts,
            production_records: production.len(),
            artifact,
            notify,
        })
    }

    async fn escalate(&self, failure: &RunFailure) {
        let title = report_title(failure.kind);
        let period_key = match failure.kind {
            PeriodKind::Daily => "data",
            PeriodKind::Weekly | PeriodKind::Monthly => "periodo",
        };
        let report = FailureReport::new(
            format!("Erro ao Gerar {title}"),
            format!(
                "Ocorreu um erro crítico ao tentar gerar ou enviar o {}. O processo foi interrompido.",
                title.to_lowercase()
            ),
        )
        .with_error(&failure.source)
        .with_context("tipo", title)
        .with_context(period_key, failure.period_label.clone())
        .with_context("etapa", failure.stage.as_str())
        .with_context("run_id", failure.run_id.to_string());

        self.reporter.report(report).await;
    }
}
