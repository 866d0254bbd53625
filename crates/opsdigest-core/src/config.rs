//! Environment-driven configuration.
//!
//! Every setting is an `OPSDIGEST_*` variable. [`AppConfig::from_lookup`]
//! takes any key lookup so tests never touch the process environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::UtcOffset;

use crate::adapters::BrokerSettings;
use crate::auth::Credentials;
use crate::calendar::Locale;
use crate::error::ConfigError;
use crate::mail::MailSettings;
use crate::notify::{GatewaySettings, MessagingSettings};
use crate::tickets::TicketFeedSettings;

pub const ENV_PREFIX: &str = "OPSDIGEST_";

const OFFSET_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// Messaging gateway plus channel behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagingConfig {
    pub gateway: GatewaySettings,
    pub channel: MessagingSettings,
}

/// Settings that decide which dates a report covers. Readable without any
/// upstream credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarConfig {
    /// `None` means "use the process local offset".
    pub utc_offset: Option<UtcOffset>,
    pub locale: Locale,
}

impl CalendarConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let utc_offset = match env.optional("UTC_OFFSET") {
            Some(raw) => Some(parse_offset(&raw)?),
            None => None,
        };

        let locale = match env.optional("LOCALE") {
            Some(raw) => Locale::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                name: "OPSDIGEST_LOCALE",
                value: raw.clone(),
                reason: String::from("expected pt-BR or en-US"),
            })?,
            None => Locale::default(),
        };

        Ok(Self { utc_offset, locale })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub broker: BrokerSettings,
    pub tickets: TicketFeedSettings,
    /// `None` when no SMTP account is configured: no email channel and
    /// failures are only logged.
    pub mail: Option<MailSettings>,
    pub messaging: Option<MessagingConfig>,
    pub output_dir: PathBuf,
    pub calendar: CalendarConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let calendar = CalendarConfig::from_lookup(&lookup)?;
        let env = Env { lookup };

        let api_url = env.required("API_URL")?;
        let credentials = Credentials::new(env.required("USERNAME")?, env.required("PASSWORD")?);
        let mut broker = BrokerSettings::new(api_url, credentials)
            .with_page_delay(Duration::from_millis(env.parsed("PAGE_DELAY_MS", 1_000)?))
            .with_timeout_ms(env.parsed("HTTP_TIMEOUT_MS", 30_000)?);
        if let Some(login_url) = env.optional("LOGIN_URL") {
            broker = broker.with_login_url(login_url);
        }

        let defaults = TicketFeedSettings::default();
        let tickets = TicketFeedSettings {
            feed_url: env.optional("TICKETS_URL").unwrap_or(defaults.feed_url),
            token: env.optional("TICKETS_TOKEN"),
            page_size: env.parsed("TICKETS_PAGE_SIZE", defaults.page_size)?,
            page_delay: Duration::from_millis(env.parsed("TICKETS_PAGE_DELAY_MS", 500)?),
            lookback_days: env.parsed("TICKETS_LOOKBACK_DAYS", defaults.lookback_days)?,
            timeout_ms: broker.timeout_ms,
        };

        let mail = match (env.optional("MAIL_USERNAME"), env.optional("MAIL_PASSWORD")) {
            (Some(username), Some(password)) => {
                let mut mail = MailSettings::new(username, password);
                if let Some(host) = env.optional("MAIL_HOST") {
                    mail.host = host;
                }
                mail.port = env.parsed("MAIL_PORT", mail.port)?;
                mail.recipient = env.optional("MAIL_RECIPIENT");
                if let Some(sender_name) = env.optional("MAIL_SENDER_NAME") {
                    mail.sender_name = sender_name;
                }
                Some(mail)
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Missing {
                    name: "OPSDIGEST_MAIL_PASSWORD",
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Missing {
                    name: "OPSDIGEST_MAIL_USERNAME",
                })
            }
        };

        let messaging = match env.optional("MESSAGING_GATEWAY_URL") {
            Some(url) => {
                let mut gateway = GatewaySettings::new(url);
                if let Some(session) = env.optional("MESSAGING_SESSION") {
                    gateway = gateway.with_session_name(session);
                }
                if let Some(key) = env.optional("MESSAGING_API_KEY") {
                    gateway = gateway.with_api_key(key);
                }
                let channel = MessagingSettings {
                    recipient: env.optional("MESSAGING_RECIPIENT"),
                    startup_timeout: Duration::from_secs(
                        env.parsed("MESSAGING_STARTUP_TIMEOUT_SECS", 300)?,
                    ),
                    ..MessagingSettings::default()
                };
                Some(MessagingConfig { gateway, channel })
            }
            None => None,
        };

        Ok(Self {
            broker,
            tickets,
            mail,
            messaging,
            output_dir: env
                .optional("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            calendar,
        })
    }
}

/// Parses `-03:00` style offsets. `Z` and `UTC` mean zero.
pub fn parse_offset(raw: &str) -> Result<UtcOffset, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(trimmed, OFFSET_FORMAT).map_err(|error| ConfigError::Invalid {
        name: "OPSDIGEST_UTC_OFFSET",
        value: raw.to_owned(),
        reason: error.to_string(),
    })
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &'static str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing {
            name: full_name(key),
        })
    }

    fn parsed<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|error: T::Err| ConfigError::Invalid {
                name: full_name(key),
                value: raw.clone(),
                reason: error.to_string(),
            }),
        }
    }
}

/// `ConfigError` carries static names, so keys map onto a fixed table.
fn full_name(key: &'static str) -> &'static str {
    match key {
        "API_URL" => "OPSDIGEST_API_URL",
        "USERNAME" => "OPSDIGEST_USERNAME",
        "PASSWORD" => "OPSDIGEST_PASSWORD",
        "PAGE_DELAY_MS" => "OPSDIGEST_PAGE_DELAY_MS",
        "HTTP_TIMEOUT_MS" => "OPSDIGEST_HTTP_TIMEOUT_MS",
        "TICKETS_PAGE_SIZE" => "OPSDIGEST_TICKETS_PAGE_SIZE",
        "TICKETS_PAGE_DELAY_MS" => "OPSDIGEST_TICKETS_PAGE_DELAY_MS",
        "TICKETS_LOOKBACK_DAYS" => "OPSDIGEST_TICKETS_LOOKBACK_DAYS",
        "MAIL_PORT" => "OPSDIGEST_MAIL_PORT",
        "MESSAGING_STARTUP_TIMEOUT_SECS" => "OPSDIGEST_MESSAGING_STARTUP_TIMEOUT_SECS",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (format!("{ENV_PREFIX}{key}"), (*value).to_owned()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const BASE: [(&str, &str); 3] = [
        ("API_URL", "https://broker.test/api/"),
        ("USERNAME", "ops@example.test"),
        ("PASSWORD", "secret"),
    ];

    #[test]
    fn minimal_environment_uses_defaults() {
        let config = config(&BASE).expect("config");

        assert_eq!(config.broker.api_url, "https://broker.test/api");
        assert_eq!(config.broker.login_url, "https://broker.test/api/login");
        assert_eq!(config.broker.page_delay, Duration::from_millis(1_000));
        assert_eq!(config.tickets.feed_url, crate::tickets::DEFAULT_FEED_URL);
        assert!(config.tickets.token.is_none());
        assert!(config.mail.is_none());
        assert!(config.messaging.is_none());
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.calendar, CalendarConfig::default());
    }

    #[test]
    fn missing_credentials_are_reported_by_name() {
        let error = config(&BASE[..2]).expect_err("password missing");
        assert_eq!(
            error,
            ConfigError::Missing {
                name: "OPSDIGEST_PASSWORD"
            }
        );
    }

    #[test]
    fn mail_and_messaging_sections() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("MAIL_USERNAME", "reports@example.test"),
            ("MAIL_PASSWORD", "pw"),
            ("MAIL_RECIPIENT", "director@example.test"),
            ("MAIL_PORT", "2525"),
            ("MESSAGING_GATEWAY_URL", "http://gateway.test"),
            ("MESSAGING_RECIPIENT", "11 98765-4321"),
            ("MESSAGING_STARTUP_TIMEOUT_SECS", "60"),
            ("UTC_OFFSET", "-03:00"),
            ("LOCALE", "en-US"),
            ("OUTPUT_DIR", "/var/reports"),
        ]);
        let config = config(&pairs).expect("config");

        let mail = config.mail.expect("mail configured");
        assert_eq!(mail.port, 2525);
        assert_eq!(mail.recipient_address(), "director@example.test");

        let messaging = config.messaging.expect("messaging configured");
        assert_eq!(messaging.gateway.session_name, "opsdigest");
        assert_eq!(messaging.channel.recipient.as_deref(), Some("11 98765-4321"));
        assert_eq!(messaging.channel.startup_timeout, Duration::from_secs(60));

        assert_eq!(
            config.calendar.utc_offset,
            Some(UtcOffset::from_hms(-3, 0, 0).expect("offset"))
        );
        assert_eq!(config.calendar.locale, Locale::EnUs);
        assert_eq!(config.output_dir, PathBuf::from("/var/reports"));
    }

    #[test]
    fn half_configured_mail_is_an_error() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MAIL_USERNAME", "reports@example.test"));
        assert!(matches!(
            config(&pairs),
            Err(ConfigError::Missing {
                name: "OPSDIGEST_MAIL_PASSWORD"
            })
        ));
    }

    #[test]
    fn invalid_numbers_and_offsets_are_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PAGE_DELAY_MS", "soon"));
        assert!(matches!(
            config(&pairs),
            Err(ConfigError::Invalid {
                name: "OPSDIGEST_PAGE_DELAY_MS",
                ..
            })
        ));

        assert_eq!(parse_offset("Z").expect("utc"), UtcOffset::UTC);
        let calendar = CalendarConfig::from_lookup(|key| {
            (key == "OPSDIGEST_LOCALE").then(|| String::from("klingon"))
        });
        assert!(matches!(
            calendar,
            Err(ConfigError::Invalid {
                name: "OPSDIGEST_LOCALE",
                ..
            })
        ));
        assert!(parse_offset("three hours").is_err());
    }
}
