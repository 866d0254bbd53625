use thiserror::Error;

use crate::http_client::HttpError;

/// Calendar errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    #[error("shifting {value} by {days} days leaves the supported calendar")]
    OutOfRange { value: String, days: i64 },

    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidSchedule {
        expression: &'static str,
        reason: String,
    },
}

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {name}")]
    Missing { name: &'static str },

    #[error("setting {name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors produced by the aggregation pipeline and its boundaries.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Date(#[from] DateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("authentication rejected with status {status}")]
    Authentication { status: u16 },

    #[error("upstream request to {endpoint} failed with status {status}")]
    UpstreamRequest { endpoint: String, status: u16 },

    #[error("transport error calling {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: HttpError,
    },

    #[error("could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("ticket feed returned status {status}")]
    TicketFeed { status: u16 },

    #[error("{channel} notification failed: {message}")]
    NotificationChannel {
        channel: &'static str,
        message: String,
    },

    #[error("spreadsheet rendering failed: {0}")]
    Render(#[from] opsdigest_workbook::WorkbookError),
}

impl ReportError {
    pub fn transport(endpoint: impl Into<String>, source: HttpError) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn decode(endpoint: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: error.to_string(),
        }
    }

    pub fn channel(channel: &'static str, message: impl Into<String>) -> Self {
        Self::NotificationChannel {
            channel,
            message: message.into(),
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Date(DateError::InvalidRange { .. }) => "date.invalid_range",
            Self::Date(_) => "date.invalid",
            Self::Config(_) => "config.invalid",
            Self::Authentication { .. } => "upstream.authentication",
            Self::UpstreamRequest { .. } => "upstream.request",
            Self::Transport { .. } => "upstream.transport",
            Self::Decode { .. } => "upstream.decode",
            Self::TicketFeed { .. } => "tickets.feed",
            Self::NotificationChannel { .. } => "notify.channel",
            Self::Render(_) => "render.workbook",
        }
    }
}
