use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use opsdigest_core::adapters::{SourceFuture, TicketFuture};
use opsdigest_core::notify::DeliveryFuture;
use opsdigest_core::{
    collect_summary, fetch_day, AccessToken, Accumulate, Artifact, CategoryRecords, Delivery,
    FixedClock, LocalDate, Locale, NotificationChannel, Notifier, Period, PeriodKind, Record,
    RecordSource, RecordingFailureReporter, ReportDigest, ReportRunner, RunOptions,
};
use serde_json::json;
use tempfile::tempdir;
use time::Weekday;

fn date(value: &str) -> LocalDate {
    LocalDate::parse(value).expect("valid date")
}

fn record(value: serde_json::Value) -> Record {
    Record::try_from(value).expect("object")
}

/// Deterministic upstream: one transmission per day, a policy on even days,
/// a claim on Wednesdays and an urgent ticket on Mondays.
#[derive(Default)]
struct CalendarSource {
    calls: Mutex<Vec<(&'static str, LocalDate)>>,
}

impl CalendarSource {
    fn log(&self, category: &'static str, day: LocalDate) {
        self.calls.lock().expect("lock").push((category, day));
    }

    fn calls(&self) -> Vec<(&'static str, LocalDate)> {
        self.calls.lock().expect("lock").clone()
    }
}

impl RecordSource for CalendarSource {
    fn authenticate<'a>(&'a self) -> SourceFuture<'a, AccessToken> {
        Box::pin(async { Ok(AccessToken::new("token")) })
    }

    fn transmissions<'a>(&'a self, _: &'a AccessToken, target: LocalDate) -> SourceFuture<'a, Vec<Record>> {
        self.log("transmissions", target);
        Box::pin(async move {
            Ok(vec![record(json!({
                "id": format!("t-{target}"),
                "dataVigenciaInicial": target.to_string(),
            }))])
        })
    }

    fn issued_policies<'a>(&'a self, _: &'a AccessToken, target: LocalDate) -> SourceFuture<'a, Vec<Record>> {
        self.log("issued_policies", target);
        Box::pin(async move {
            if target.day() % 2 == 0 {
                Ok(vec![record(json!({ "dataEmitida": target.to_string() }))])
            } else {
                Ok(Vec::new())
            }
        })
    }

    fn claims<'a>(&'a self, _: &'a AccessToken, target: LocalDate) -> SourceFuture<'a, Vec<Record>> {
        self.log("claims", target);
        Box::pin(async move {
            if target.weekday() == Weekday::Wednesday {
                Ok(vec![record(json!({ "dataAviso": target.to_string() }))])
            } else {
                Ok(Vec::new())
            }
        })
    }

    fn urgent_tickets<'a>(&'a self, target: LocalDate) -> TicketFuture<'a> {
        self.log("urgent_tickets", target);
        Box::pin(async move {
            if target.weekday() == Weekday::Monday {
                vec![record(json!({ "id": 7, "aberto": target.to_string() }))]
            } else {
                Vec::new()
            }
        })
    }

    fn production_for_period<'a>(
        &'a self,
        _: &'a AccessToken,
        start: LocalDate,
        end: LocalDate,
    ) -> SourceFuture<'a, Vec<Record>> {
        Box::pin(async move {
            Ok(vec![
                record(json!({ "propostaId": 1, "dataVigenciaInicial": start.to_string() })),
                record(json!({ "propostaId": 2, "dataVigenciaInicial": end.to_string() })),
            ])
        })
    }
}

/// Captures what each delivery saw, including whether the file was on disk.
#[derive(Default)]
struct CapturingChannel {
    deliveries: Mutex<Vec<(String, PathBuf, bool)>>,
}

impl NotificationChannel for CapturingChannel {
    fn name(&self) -> &'static str {
        "capture"
    }

    fn display_name(&self) -> &'static str {
        "Captura"
    }

    fn deliver<'a>(&'a self, digest: &'a ReportDigest, artifact: &'a Artifact) -> DeliveryFuture<'a> {
        Box::pin(async move {
            self.deliveries.lock().expect("lock").push((
                digest.email_subject(),
                artifact.path.clone(),
                artifact.exists(),
            ));
            Ok(Delivery::Sent)
        })
    }
}

#[tokio::test]
async fn weekly_summary_is_the_concatenation_of_its_days() {
    let clock = FixedClock::on(date("2024-05-08"));
    let period = Period::for_kind(PeriodKind::Weekly, &clock, Locale::default()).expect("period");
    let source = CalendarSource::default();
    let token = AccessToken::new("token");

    let summary = collect_summary(&source, &token, &period).await.expect("summary");

    let mut expected = CategoryRecords::default();
    for day in period.dates().expect("dates") {
        expected.concat(fetch_day(&source, &token, day).await.expect("day"));
    }
    assert_eq!(summary, expected);

    let counts = summary.counts();
    assert_eq!(counts.transmissions, 5);
    // 2024-04-30 and 2024-05-02
    assert_eq!(counts.issued_policies, 2);
    assert_eq!(counts.claims, 1);
    assert_eq!(counts.urgent_tickets, 1);
    assert_eq!(
        summary.transmissions.first().and_then(|r| r.get("id")),
        Some(&json!("t-2024-04-29"))
    );
    assert_eq!(
        summary.transmissions.last().and_then(|r| r.get("id")),
        Some(&json!("t-2024-05-03"))
    );
}

#[tokio::test]
async fn days_are_fetched_in_order_one_category_at_a_time() {
    let source = CalendarSource::default();
    let period = Period::new(PeriodKind::Weekly, date("2024-04-29"), date("2024-04-30"), "x")
        .expect("period");

    collect_summary(&source, &AccessToken::new("token"), &period)
        .await
        .expect("summary");

    let monday = date("2024-04-29");
    let tuesday = date("2024-04-30");
    assert_eq!(
        source.calls(),
        vec![
            ("transmissions", monday),
            ("issued_policies", monday),
            ("claims", monday),
            ("urgent_tickets", monday),
            ("transmissions", tuesday),
            ("issued_policies", tuesday),
            ("claims", tuesday),
            ("urgent_tickets", tuesday),
        ]
    );
}

#[tokio::test]
async fn single_day_period_touches_each_category_once() {
    let source = CalendarSource::default();

    collect_summary(&source, &AccessToken::new("token"), &Period::single_day(date("2024-05-06")))
        .await
        .expect("summary");

    assert_eq!(source.calls().len(), 4);
}

#[tokio::test]
async fn monthly_run_delivers_while_the_spreadsheet_exists_then_removes_it() {
    let temp = tempdir().expect("tempdir");
    let reporter = Arc::new(RecordingFailureReporter::new());
    let channel = Arc::new(CapturingChannel::default());
    let runner = ReportRunner::new(
        Arc::new(CalendarSource::default()),
        Notifier::new(reporter.clone()).with_channel(channel.clone()),
        reporter.clone(),
        Arc::new(FixedClock::on(date("2024-05-08"))),
    )
    .with_output_dir(temp.path());

    let summary = runner
        .run(PeriodKind::Monthly, &RunOptions::new())
        .await
        .expect("run");

    assert_eq!(summary.period.start, date("2024-04-01"));
    assert_eq!(summary.period.end, date("2024-04-30"));
    assert_eq!(summary.counts.transmissions, 30);
    assert_eq!(summary.production_records, 2);
    assert_eq!(summary.notify.sent(), 1);
    assert!(summary.artifact.is_none());

    let deliveries = channel.deliveries.lock().expect("lock").clone();
    assert_eq!(deliveries.len(), 1);
    let (subject, path, existed) = &deliveries[0];
    assert!(subject.starts_with("Relatório Mensal - Centro de Operações"));
    assert!(existed);
    assert!(!path.exists());
    assert!(reporter.reports().is_empty());
}

#[tokio::test]
async fn render_only_runs_skip_every_channel() {
    let temp = tempdir().expect("tempdir");
    let reporter = Arc::new(RecordingFailureReporter::new());
    let channel = Arc::new(CapturingChannel::default());
    let runner = ReportRunner::new(
        Arc::new(CalendarSource::default()),
        Notifier::new(reporter.clone()).with_channel(channel.clone()),
        reporter,
        Arc::new(FixedClock::on(date("2024-05-08"))),
    )
    .with_output_dir(temp.path());

    let summary = runner
        .run(PeriodKind::Daily, &RunOptions::new().without_notify().keeping_artifact())
        .await
        .expect("run");

    assert!(summary.notify.channels.is_empty());
    assert!(channel.deliveries.lock().expect("lock").is_empty());
    let artifact = summary.artifact.expect("kept");
    assert_eq!(artifact.file_name, "relatorio_completo_2024-05-07.xlsx");
    assert!(artifact.exists());
}
