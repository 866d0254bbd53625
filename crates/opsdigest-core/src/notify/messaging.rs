use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use opsdigest_workbook::{Artifact, XLSX_MIME};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{Delivery, DeliveryFuture, NotificationChannel, ReportDigest};
use crate::error::ReportError;
use crate::retry::RetryPolicy;

const CHANNEL: &str = "messaging";
const COUNTRY_CODE: &str = "55";
const CHAT_SUFFIX: &str = "@c.us";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("recipient '{0}' contains no digits")]
    InvalidRecipient(String),

    #[error("messaging session did not become ready within {seconds}s")]
    StartupTimeout { seconds: u64 },

    #[error("messaging session failed to start: {0}")]
    SessionFailed(String),

    #[error("gateway {operation} failed with status {status}")]
    Gateway { operation: &'static str, status: u16 },

    #[error("gateway {operation} transport error: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    #[error("could not read attachment: {0}")]
    Attachment(String),
}

pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, MessagingError>> + Send + 'a>>;

/// File sent alongside the text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn from_artifact(artifact: &Artifact) -> Result<Self, MessagingError> {
        let bytes = artifact
            .read_bytes()
            .map_err(|error| MessagingError::Attachment(error.to_string()))?;
        Ok(Self {
            file_name: artifact.file_name.clone(),
            mime_type: XLSX_MIME.to_owned(),
            bytes,
        })
    }
}

/// Opens sessions against a messaging service.
pub trait MessagingConnector: Send + Sync {
    fn connect<'a>(&'a self) -> SessionFuture<'a, Box<dyn MessagingSession>>;
}

/// A live, authenticated messaging session.
pub trait MessagingSession: Send + Sync {
    /// Resolves once the session can send. Callers bound this with a timeout.
    fn wait_ready<'a>(&'a self) -> SessionFuture<'a, ()>;

    fn send_text<'a>(&'a self, chat_id: &'a str, text: &'a str) -> SessionFuture<'a, ()>;

    fn send_document<'a>(&'a self, chat_id: &'a str, document: &'a Document) -> SessionFuture<'a, ()>;

    fn close<'a>(&'a self) -> SessionFuture<'a, ()>;
}

/// Turns a free-form phone number into a chat id: digits only, with the
/// country code prefixed when missing.
pub fn normalize_recipient(raw: &str) -> Result<String, MessagingError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(MessagingError::InvalidRecipient(raw.to_owned()));
    }
    let number = if digits.starts_with(COUNTRY_CODE) {
        digits
    } else {
        format!("{COUNTRY_CODE}{digits}")
    };
    Ok(format!("{number}{CHAT_SUFFIX}"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessagingSettings {
    /// Phone number of the reader. `None` skips the channel.
    pub recipient: Option<String>,
    pub startup_timeout: Duration,
    /// Applied to each send separately.
    pub retry: RetryPolicy,
    /// Pause between the text and the document.
    pub send_pause: Duration,
}

impl Default for MessagingSettings {
    fn default() -> Self {
        Self {
            recipient: None,
            startup_timeout: Duration::from_secs(300),
            retry: RetryPolicy::default(),
            send_pause: Duration::from_secs(2),
        }
    }
}

/// Chat delivery: summary text followed by the spreadsheet.
#[derive(Clone)]
pub struct MessagingChannel {
    connector: Arc<dyn MessagingConnector>,
    settings: MessagingSettings,
}

impl MessagingChannel {
    pub fn new(connector: Arc<dyn MessagingConnector>, settings: MessagingSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    async fn send_over(
        &self,
        session: &dyn MessagingSession,
        chat_id: &str,
        digest: &ReportDigest,
        document: &Document,
    ) -> Result<(), MessagingError> {
        let startup = self.settings.startup_timeout;
        tokio::time::timeout(startup, session.wait_ready())
            .await
            .map_err(|_| MessagingError::StartupTimeout {
                seconds: startup.as_secs(),
            })??;
        debug!("messaging session ready");

        let text = digest.messaging_text();
        self.settings
            .retry
            .run("send summary text", |_| session.send_text(chat_id, &text))
            .await?;

        if !self.settings.send_pause.is_zero() {
            tokio::time::sleep(self.settings.send_pause).await;
        }

        self.settings
            .retry
            .run("send spreadsheet", |_| session.send_document(chat_id, document))
            .await?;
        info!(
            attachment = %document.file_name,
            bytes = document.bytes.len(),
            "spreadsheet sent over messaging"
        );
        Ok(())
    }

    async fn deliver_to(
        &self,
        recipient: &str,
        digest: &ReportDigest,
        artifact: &Artifact,
    ) -> Result<(), MessagingError> {
        let chat_id = normalize_recipient(recipient)?;
        let document = Document::from_artifact(artifact)?;

        let session = self.connector.connect().await?;
        let outcome = self.send_over(session.as_ref(), &chat_id, digest, &document).await;

        if let Err(error) = session.close().await {
            warn!(%error, "could not close messaging session");
        }
        outcome
    }
}

impl NotificationChannel for MessagingChannel {
    fn name(&self) -> &'static str {
        CHANNEL
    }

    fn display_name(&self) -> &'static str {
        "WhatsApp"
    }

    fn deliver<'a>(&'a self, digest: &'a ReportDigest, artifact: &'a Artifact) -> DeliveryFuture<'a> {
        Box::pin(async move {
            let Some(recipient) = self.settings.recipient.as_deref() else {
                return Ok(Delivery::Skipped);
            };
            self.deliver_to(recipient, digest, artifact)
                .await
                .map_err(|error| ReportError::channel(CHANNEL, error.to_string()))?;
            Ok(Delivery::Sent)
        })
    }
}
