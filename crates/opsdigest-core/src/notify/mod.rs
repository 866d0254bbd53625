//! Delivery of a finished report to its readers.
//!
//! A [`Notifier`] owns the configured [`NotificationChannel`]s. Every channel
//! is attempted on its own; a failing channel is logged and escalated through
//! the [`FailureReporter`] but never stops the other channels or the run.

mod digest;
mod email;
mod gateway;
mod messaging;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use opsdigest_workbook::Artifact;
use tracing::{error, info};

pub use digest::{report_title, ReportDigest};
pub use email::EmailChannel;
pub use gateway::{GatewaySettings, HttpGatewayConnector};
pub use messaging::{
    normalize_recipient, Document, MessagingChannel, MessagingConnector, MessagingError,
    MessagingSession, MessagingSettings, SessionFuture,
};

use crate::calendar::PeriodKind;
use crate::error::ReportError;
use crate::failure::{FailureReport, FailureReporter};

/// Result of one channel attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Channel has no recipient configured.
    Skipped,
}

pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = Result<Delivery, ReportError>> + Send + 'a>>;

/// One way of getting a digest and its spreadsheet to a reader.
pub trait NotificationChannel: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;

    /// Name shown to humans in failure reports.
    fn display_name(&self) -> &'static str;

    fn deliver<'a>(&'a self, digest: &'a ReportDigest, artifact: &'a Artifact) -> DeliveryFuture<'a>;
}

/// What happened on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: &'static str,
    pub result: Result<Delivery, String>,
}

/// Per-channel outcomes of a notify call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub channels: Vec<ChannelOutcome>,
}

impl NotifyOutcome {
    pub fn sent(&self) -> usize {
        self.count(|result| matches!(result, Ok(Delivery::Sent)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|result| matches!(result, Ok(Delivery::Skipped)))
    }

    pub fn failed(&self) -> usize {
        self.count(Result::is_err)
    }

    fn count(&self, predicate: impl Fn(&Result<Delivery, String>) -> bool) -> usize {
        self.channels
            .iter()
            .filter(|outcome| predicate(&outcome.result))
            .count()
    }
}

/// Fans a digest out to every configured channel.
#[derive(Clone)]
pub struct Notifier {
    channels: Vec<Arc<dyn NotificationChannel>>,
    reporter: Arc<dyn FailureReporter>,
}

impl Notifier {
    pub fn new(reporter: Arc<dyn FailureReporter>) -> Self {
        Self {
            channels: Vec::new(),
            reporter,
        }
    }

    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|channel| channel.name()).collect()
    }

    /// Attempts every channel in order. Never fails.
    pub async fn notify(&self, digest: &ReportDigest, artifact: &Artifact) -> NotifyOutcome {
        let mut outcome = NotifyOutcome::default();

        for channel in &self.channels {
            let result = channel.deliver(digest, artifact).await;
            match &result {
                Ok(Delivery::Sent) => info!(
                    channel = channel.name(),
                    period = %digest.period.label,
                    "report delivered"
                ),
                Ok(Delivery::Skipped) => info!(
                    channel = channel.name(),
                    "no recipient configured, channel skipped"
                ),
                Err(channel_error) => {
                    error!(
                        channel = channel.name(),
                        period = %digest.period.label,
                        error = %channel_error,
                        "report delivery failed"
                    );
                    self.reporter
                        .report(delivery_failure(channel.as_ref(), digest, channel_error))
                        .await;
                }
            }

            outcome.channels.push(ChannelOutcome {
                channel: channel.name(),
                result: result.map_err(|channel_error| channel_error.to_string()),
            });
        }

        outcome
    }
}

fn delivery_failure(
    channel: &dyn NotificationChannel,
    digest: &ReportDigest,
    channel_error: &ReportError,
) -> FailureReport {
    let title = digest.title();
    let report = FailureReport::new(
        format!("Erro ao Enviar {} - {title}", channel.display_name()),
        format!(
            "Ocorreu um erro ao tentar enviar o {} via {}. O relatório foi gerado, \
             mas falhou o envio por este canal.",
            title.to_lowercase(),
            channel.display_name()
        ),
    )
    .with_error(channel_error);

    let period_key = match digest.kind() {
        PeriodKind::Daily => "data",
        PeriodKind::Weekly | PeriodKind::Monthly => "periodo",
    };
    report
        .with_context(period_key, digest.period.label.clone())
        .with_context("tipo", title)
        .with_context("canal", channel.name())
}
