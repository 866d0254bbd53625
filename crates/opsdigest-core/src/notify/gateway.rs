//! HTTP messaging gateway client.
//!
//! The gateway keeps a logged-in chat session on its side and exposes it over
//! a small JSON API:
//!
//! | Call | Purpose |
//! |------|---------|
//! | `POST /api/sessions/start` | start (or resume) the named session |
//! | `GET /api/sessions/{name}` | poll status until `WORKING` |
//! | `POST /api/sendText` | send a text message |
//! | `POST /api/sendFile` | send a base64 encoded document |
//! | `POST /api/sessions/stop` | release the session |

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::messaging::{Document, MessagingConnector, MessagingError, MessagingSession, SessionFuture};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};

const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub base_url: String,
    pub session_name: String,
    pub api_key: Option<String>,
    pub poll_interval: Duration,
    pub timeout_ms: u64,
}

impl GatewaySettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            session_name: String::from("opsdigest"),
            api_key: None,
            poll_interval: Duration::from_secs(2),
            timeout_ms: 60_000,
        }
    }

    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = session_name.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn auth(&self) -> HttpAuth {
        match &self.api_key {
            Some(key) => HttpAuth::Header {
                name: API_KEY_HEADER.to_owned(),
                value: key.clone(),
            },
            None => HttpAuth::None,
        }
    }
}

impl std::fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("base_url", &self.base_url)
            .field("session_name", &self.session_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("poll_interval", &self.poll_interval)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SessionStatus {
    status: String,
}

#[derive(Clone)]
struct GatewayClient {
    http: Arc<dyn HttpClient>,
    settings: GatewaySettings,
}

impl GatewayClient {
    async fn call(
        &self,
        operation: &'static str,
        request: HttpRequest,
    ) -> Result<HttpResponse, MessagingError> {
        let request = request
            .with_auth(&self.settings.auth())
            .with_timeout_ms(self.settings.timeout_ms);
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|error| MessagingError::Transport {
                operation,
                message: error.to_string(),
            })?;
        if !response.is_success() {
            return Err(MessagingError::Gateway {
                operation,
                status: response.status,
            });
        }
        Ok(response)
    }

    async fn post(
        &self,
        operation: &'static str,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<HttpResponse, MessagingError> {
        let request = HttpRequest::post(format!("{}{path}", self.settings.base_url))
            .with_json(&payload)
            .map_err(|error| MessagingError::Transport {
                operation,
                message: error.to_string(),
            })?;
        self.call(operation, request).await
    }
}

/// Opens sessions on an HTTP messaging gateway.
#[derive(Clone)]
pub struct HttpGatewayConnector {
    client: GatewayClient,
}

impl HttpGatewayConnector {
    pub fn new(http: Arc<dyn HttpClient>, settings: GatewaySettings) -> Self {
        Self {
            client: GatewayClient { http, settings },
        }
    }
}

impl MessagingConnector for HttpGatewayConnector {
    fn connect<'a>(&'a self) -> SessionFuture<'a, Box<dyn MessagingSession>> {
        Box::pin(async move {
            let name = self.client.settings.session_name.clone();
            self.client
                .post("start session", "/api/sessions/start", json!({ "name": name }))
                .await?;
            debug!(session = %name, "messaging session started");
            let session: Box<dyn MessagingSession> = Box::new(GatewaySession {
                client: self.client.clone(),
            });
            Ok(session)
        })
    }
}

struct GatewaySession {
    client: GatewayClient,
}

impl GatewaySession {
    fn name(&self) -> &str {
        &self.client.settings.session_name
    }

    async fn status(&self) -> Result<String, MessagingError> {
        let url = format!("{}/api/sessions/{}", self.client.settings.base_url, self.name());
        let response = self.client.call("session status", HttpRequest::get(url)).await?;
        let status: SessionStatus =
            serde_json::from_str(&response.body).map_err(|error| MessagingError::Transport {
                operation: "session status",
                message: error.to_string(),
            })?;
        Ok(status.status)
    }
}

impl MessagingSession for GatewaySession {
    fn wait_ready<'a>(&'a self) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            loop {
                let status = self.status().await?;
                match status.as_str() {
                    "WORKING" => return Ok(()),
                    "FAILED" | "STOPPED" => {
                        return Err(MessagingError::SessionFailed(format!(
                            "session {} is {status}",
                            self.name()
                        )))
                    }
                    _ => {
                        debug!(session = self.name(), %status, "waiting for messaging session");
                        tokio::time::sleep(self.client.settings.poll_interval).await;
                    }
                }
            }
        })
    }

    fn send_text<'a>(&'a self, chat_id: &'a str, text: &'a str) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .post(
                    "send text",
                    "/api/sendText",
                    json!({ "session": self.name(), "chatId": chat_id, "text": text }),
                )
                .await
                .map(|_| ())
        })
    }

    fn send_document<'a>(&'a self, chat_id: &'a str, document: &'a Document) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            let payload = json!({
                "session": self.name(),
                "chatId": chat_id,
                "caption": document.file_name,
                "file": {
                    "mimetype": document.mime_type,
                    "filename": document.file_name,
                    "data": STANDARD.encode(&document.bytes),
                },
            });
            self.client
                .post("send file", "/api/sendFile", payload)
                .await
                .map(|_| ())
        })
    }

    fn close<'a>(&'a self) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .post("stop session", "/api/sessions/stop", json!({ "name": self.name() }))
                .await
                .map(|_| ())
        })
    }
}
