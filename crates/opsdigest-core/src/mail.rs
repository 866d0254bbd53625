//! SMTP delivery shared by the email channel and the failure reporter.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

pub const DEFAULT_SMTP_HOST: &str = "smtp.dreamhost.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("invalid mail address '{value}': {message}")]
    Address { value: String, message: String },

    #[error("could not build message: {0}")]
    Build(String),

    #[error("smtp delivery failed: {0}")]
    Transport(String),
}

/// SMTP account and addressing.
#[derive(Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Report recipient. Defaults to the sending account.
    pub recipient: Option<String>,
    pub sender_name: String,
}

impl MailSettings {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_owned(),
            port: DEFAULT_SMTP_PORT,
            username: username.into(),
            password: password.into(),
            recipient: None,
            sender_name: String::from("Sistema de Relatórios"),
        }
    }

    pub fn sender(&self) -> Result<Mailbox, MailError> {
        Ok(Mailbox::new(
            Some(self.sender_name.clone()),
            parse_address(&self.username)?,
        ))
    }

    pub fn recipient_address(&self) -> &str {
        self.recipient.as_deref().unwrap_or(&self.username)
    }

    pub fn recipient(&self) -> Result<Mailbox, MailError> {
        Ok(Mailbox::new(None, parse_address(self.recipient_address())?))
    }
}

impl Debug for MailSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .field("sender_name", &self.sender_name)
            .finish()
    }
}

pub fn parse_address(value: &str) -> Result<Address, MailError> {
    value.trim().parse::<Address>().map_err(|error| MailError::Address {
        value: value.to_owned(),
        message: error.to_string(),
    })
}

pub type MailFuture<'a> = Pin<Box<dyn Future<Output = Result<(), MailError>> + Send + 'a>>;

/// Outgoing mail transport.
pub trait Mailer: Send + Sync {
    fn send<'a>(&'a self, message: Message) -> MailFuture<'a>;
}

/// STARTTLS SMTP transport.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|error| MailError::Transport(error.to_string()))?
            .port(settings.port)
            .credentials(SmtpCredentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        Ok(Self { transport })
    }
}

impl Mailer for SmtpMailer {
    fn send<'a>(&'a self, message: Message) -> MailFuture<'a> {
        Box::pin(async move {
            self.transport
                .send(message)
                .await
                .map(|_| ())
                .map_err(|error| MailError::Transport(error.to_string()))
        })
    }
}

/// Mailer that keeps every message in memory. Can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Message>>,
    failure: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Mailer for RecordingMailer {
    fn send<'a>(&'a self, message: Message) -> MailFuture<'a> {
        let outcome = match &self.failure {
            Some(reason) => Err(MailError::Transport(reason.clone())),
            None => {
                self.sent
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(message);
                Ok(())
            }
        };
        Box::pin(async move { outcome })
    }
}

/// Minimal HTML escaping for values interpolated into mail bodies.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
