//! # opsdigest core
//!
//! Period aggregation pipeline behind the operations-center digests.
//!
//! ## Overview
//!
//! A report run picks a period (previous day, last business week or last
//! month), fetches four categories of records for every day of it from the
//! broker API and the ticket feed, renders the period's full production into a
//! spreadsheet and sends a short summary plus the spreadsheet to its readers.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Per-category fetch adapters and the [`RecordSource`] seam |
//! | [`aggregator`] | Day-by-day composition of period results |
//! | [`auth`] | Broker login |
//! | [`calendar`] | Local dates, clocks and report periods |
//! | [`config`] | `OPSDIGEST_*` environment configuration |
//! | [`error`] | Core error types |
//! | [`failure`] | Failure escalation hook |
//! | [`filter`] | Exact-date record filtering |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`mail`] | SMTP transport shared by notification and failure reports |
//! | [`notify`] | Email and messaging delivery channels |
//! | [`pacer`] | Inter-request pacing |
//! | [`pagination`] | Paginated search over a date window |
//! | [`record`] | Opaque upstream records |
//! | [`retry`] | Retry policy for delivery operations |
//! | [`runner`] | End-to-end report run |
//! | [`schedule`] | Wall-clock triggers |
//! | [`tickets`] | Incremental urgent-ticket scan |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opsdigest_core::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
//!     let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(time::UtcOffset::UTC));
//!
//!     let source = HttpRecordSource::new(
//!         BrokerApi::new(http.clone(), clock.clone(), config.broker.clone()),
//!         TicketScanner::new(http, config.tickets.clone()),
//!     );
//!     let reporter: Arc<dyn FailureReporter> = Arc::new(LogFailureReporter);
//!     let runner = ReportRunner::new(Arc::new(source), Notifier::new(reporter.clone()), reporter, clock);
//!
//!     let summary = runner.run(PeriodKind::Daily, &RunOptions::new()).await?;
//!     println!("{} transmissions", summary.counts.transmissions);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ ReportRunner │──▶│  Aggregator  │──▶│  RecordSource    │
//! └──────┬───────┘   └──────────────┘   │ (broker, tickets)│
//!        │                              └────────┬─────────┘
//!        ▼                                       ▼
//! ┌──────────────┐                      ┌──────────────────┐
//! │   Workbook   │                      │ PageFetcher +    │
//! └──────┬───────┘                      │ RequestPacer     │
//!        ▼                              └────────┬─────────┘
//! ┌──────────────┐   ┌──────────────┐            ▼
//! │   Notifier   │──▶│ Email / Chat │   ┌──────────────────┐
//! └──────────────┘   └──────────────┘   │ HttpClient       │
//!                                       └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Fetch failures surface as [`ReportError`] and abort a run, which then comes
//! back as a [`RunFailure`] carrying the stage and period. Ticket-feed problems
//! only shrink the urgent-ticket count, and notification problems are reported
//! per channel without aborting.
//!
//! ## Security
//!
//! - Credentials and tokens are read from the environment and never logged
//! - HTTP goes through rustls, SMTP through STARTTLS

pub mod adapters;
pub mod aggregator;
pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod failure;
pub mod filter;
pub mod http_client;
pub mod mail;
pub mod notify;
pub mod pacer;
pub mod pagination;
pub mod record;
pub mod retry;
pub mod runner;
pub mod schedule;
pub mod tickets;

// Adapters
pub use adapters::{BrokerApi, BrokerSettings, HttpRecordSource, RecordSource};

// Aggregation
pub use aggregator::{aggregate, collect_summary, fetch_day, Accumulate, CategoryRecords, SummaryCounts};

// Authentication
pub use auth::{authenticate, AccessToken, Credentials};

// Calendar
pub use calendar::{
    date_range, format_date, iso_midnight_utc, last_month_range, last_week_range, Clock, FixedClock,
    LocalDate, Locale, Period, PeriodKind, SystemClock,
};

// Configuration
pub use config::{AppConfig, CalendarConfig, MessagingConfig};

// Errors
pub use error::{ConfigError, DateError, ReportError};

// Failure reporting
pub use failure::{
    EmailFailureReporter, FailureReport, FailureReporter, LogFailureReporter, RecordingFailureReporter,
};

// Filtering
pub use filter::{filter_by_date, filter_by_dates, DateField};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};

// Mail
pub use mail::{MailError, MailSettings, Mailer, RecordingMailer, SmtpMailer};

// Notification
pub use notify::{
    normalize_recipient, report_title, Delivery, EmailChannel, GatewaySettings,
    HttpGatewayConnector, MessagingChannel, MessagingConnector, MessagingSession,
    MessagingSettings, NotificationChannel, Notifier, NotifyOutcome, ReportDigest,
};

// Pacing and pagination
pub use pacer::RequestPacer;
pub use pagination::{PageFetcher, SearchQuery, SearchWindow};

// Records
pub use record::{Record, RecordId};

// Retry
pub use retry::{Backoff, RetryPolicy};

// Runs and scheduling
pub use runner::{ReportRunner, RunFailure, RunOptions, RunSummary, Stage};
pub use schedule::{due_at, next_trigger, Trigger};

// Tickets
pub use tickets::{is_urgent, TicketFeedSettings, TicketScanner};

// Rendering boundary
pub use opsdigest_workbook::{Artifact, WorkbookError};
