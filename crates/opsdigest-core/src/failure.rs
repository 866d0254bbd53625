//! Uniform escalation of failures to a human.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use lettre::message::header::ContentType;
use lettre::Message;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::mail::{escape_html, MailError, MailSettings, Mailer};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day]/[month]/[year] [hour]:[minute]:[second]");
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[day]/[month]/[year]");

/// Everything needed to diagnose a failure without log access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub title: String,
    pub message: String,
    /// Rendered error with its source chain, outermost first.
    pub error_chain: Vec<String>,
    pub context: Vec<(String, String)>,
    pub occurred_at: OffsetDateTime,
}

impl FailureReport {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            error_chain: Vec::new(),
            context: Vec::new(),
            occurred_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_error(mut self, error: &(dyn StdError + 'static)) -> Self {
        self.error_chain = error_chain(error);
        self
    }

    pub fn with_error_text(mut self, error: impl Into<String>) -> Self {
        self.error_chain = vec![error.into()];
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn at(mut self, occurred_at: OffsetDateTime) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn subject(&self) -> String {
        let date = self
            .occurred_at
            .format(DATE_FORMAT)
            .unwrap_or_else(|_| self.occurred_at.date().to_string());
        format!("🚨 {} - {date}", self.title)
    }

    pub fn to_html(&self) -> String {
        let timestamp = self
            .occurred_at
            .format(TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| self.occurred_at.to_string());

        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"></head>\n\
             <body style=\"font-family: Arial, sans-serif; padding: 20px; background-color: #f5f5f5;\">\n\
             <div style=\"max-width: 600px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px;\">\n",
        );
        html.push_str(&format!(
            "<h1 style=\"color: #d32f2f; margin-top: 0;\">⚠️ {}</h1>\n",
            escape_html(&self.title)
        ));
        html.push_str(&format!(
            "<p style=\"font-size: 16px; line-height: 1.6;\">{}</p>\n",
            escape_html(&self.message)
        ));
        html.push_str(&format!(
            "<p style=\"color: #666; font-size: 14px;\"><strong>Data/Hora:</strong> {timestamp}</p>\n"
        ));

        if !self.error_chain.is_empty() {
            html.push_str("<strong>Erro:</strong>\n<pre style=\"white-space: pre-wrap; background: #f5f5f5; padding: 10px; border-radius: 4px;\">");
            let rendered: Vec<String> = self
                .error_chain
                .iter()
                .enumerate()
                .map(|(depth, cause)| {
                    if depth == 0 {
                        escape_html(cause)
                    } else {
                        format!("causado por: {}", escape_html(cause))
                    }
                })
                .collect();
            html.push_str(&rendered.join("\n"));
            html.push_str("</pre>\n");
        }

        if !self.context.is_empty() {
            html.push_str("<strong>Contexto:</strong>\n<ul>");
            for (key, value) in &self.context {
                html.push_str(&format!(
                    "<li><strong>{}:</strong> {}</li>",
                    escape_html(key),
                    escape_html(value)
                ));
            }
            html.push_str("</ul>\n");
        }

        html.push_str("</div>\n</body>\n</html>\n");
        html
    }
}

/// Renders `error` and every `source()` below it.
pub fn error_chain(error: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = vec![error.to_string()];
    let mut current = error.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}

pub type ReportFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Failure escalation hook. Implementations never fail: problems while
/// reporting are logged and swallowed.
pub trait FailureReporter: Send + Sync {
    fn report<'a>(&'a self, report: FailureReport) -> ReportFuture<'a>;
}

/// Writes failures to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFailureReporter;

impl FailureReporter for LogFailureReporter {
    fn report<'a>(&'a self, report: FailureReport) -> ReportFuture<'a> {
        Box::pin(async move {
            error!(
                title = %report.title,
                message = %report.message,
                error = %report.error_chain.join(": "),
                context = ?report.context,
                "failure reported"
            );
        })
    }
}

/// Mails failures to the configured recipient, falling back to the log when
/// the mail itself cannot be sent.
#[derive(Clone)]
pub struct EmailFailureReporter {
    mailer: Arc<dyn Mailer>,
    settings: MailSettings,
}

impl EmailFailureReporter {
    pub fn new(mailer: Arc<dyn Mailer>, settings: MailSettings) -> Self {
        Self { mailer, settings }
    }

    fn build_message(&self, report: &FailureReport) -> Result<Message, MailError> {
        Message::builder()
            .from(self.settings.sender()?)
            .to(self.settings.recipient()?)
            .subject(report.subject())
            .header(ContentType::TEXT_HTML)
            .body(report.to_html())
            .map_err(|error| MailError::Build(error.to_string()))
    }
}

impl FailureReporter for EmailFailureReporter {
    fn report<'a>(&'a self, report: FailureReport) -> ReportFuture<'a> {
        Box::pin(async move {
            let outcome = match self.build_message(&report) {
                Ok(message) => self.mailer.send(message).await,
                Err(error) => Err(error),
            };

            match outcome {
                Ok(()) => info!(
                    title = %report.title,
                    recipient = self.settings.recipient_address(),
                    "failure report mailed"
                ),
                Err(mail_error) => error!(
                    %mail_error,
                    title = %report.title,
                    message = %report.message,
                    error = %report.error_chain.join(": "),
                    context = ?report.context,
                    "could not mail failure report"
                ),
            }
        })
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct RecordingFailureReporter {
    reports: Mutex<Vec<FailureReport>>,
}

impl RecordingFailureReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl FailureReporter for RecordingFailureReporter {
    fn report<'a>(&'a self, report: FailureReport) -> ReportFuture<'a> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(report);
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::RecordingMailer;
    use time::macros::datetime;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("inner <cause>")]
    struct Inner;

    fn report() -> FailureReport {
        FailureReport::new("Erro ao Gerar Relatório Diário", "O processo foi interrompido.")
            .with_error(&Outer(Inner))
            .with_context("tipo", "Relatório Diário")
            .with_context("data", "2024-05-01")
            .at(datetime!(2024-05-02 06:00:05 UTC))
    }

    #[test]
    fn error_chain_walks_sources() {
        assert_eq!(report().error_chain, vec!["outer failure", "inner <cause>"]);
    }

    #[test]
    fn html_lists_error_chain_and_context_escaped() {
        let html = report().to_html();

        assert!(html.contains("Erro ao Gerar Relatório Diário"));
        assert!(html.contains("causado por: inner &lt;cause&gt;"));
        assert!(html.contains("<li><strong>data:</strong> 2024-05-01</li>"));
        assert!(html.contains("02/05/2024 06:00:05"));
    }

    #[test]
    fn subject_carries_title_and_date() {
        assert_eq!(report().subject(), "🚨 Erro ao Gerar Relatório Diário - 02/05/2024");
        assert_eq!(report().context_value("tipo"), Some("Relatório Diário"));
    }

    #[tokio::test]
    async fn email_reporter_sends_to_configured_recipient() {
        let mailer = Arc::new(RecordingMailer::new());
        let mut settings = MailSettings::new("ops@example.test", "pw");
        settings.recipient = Some(String::from("boss@example.test"));

        EmailFailureReporter::new(mailer.clone(), settings)
            .report(report())
            .await;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].envelope().to()[0].to_string(), "boss@example.test");
    }

    #[tokio::test]
    async fn email_reporter_swallows_delivery_errors() {
        let mailer = Arc::new(RecordingMailer::failing("smtp down"));
        EmailFailureReporter::new(mailer.clone(), MailSettings::new("ops@example.test", "pw"))
            .report(report())
            .await;

        assert_eq!(mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn recording_reporter_keeps_reports() {
        let reporter = RecordingFailureReporter::new();
        reporter.report(report()).await;
        assert_eq!(reporter.reports().len(), 1);
    }
}
