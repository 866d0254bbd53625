//! Upstream login.

use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ReportError;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};

/// Login credentials for the broker API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session token returned by the login endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> HttpAuth {
        HttpAuth::BearerToken(self.0.clone())
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    senha: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    data: LoginData,
}

#[derive(Deserialize)]
struct LoginData {
    token: String,
}

/// Exchanges credentials for an access token. A single request, never retried.
pub async fn authenticate(
    http_client: &dyn HttpClient,
    login_url: &str,
    credentials: &Credentials,
    timeout_ms: u64,
) -> Result<AccessToken, ReportError> {
    debug!(login_url, username = %credentials.username, "authenticating");

    let request = HttpRequest::post(login_url)
        .with_timeout_ms(timeout_ms)
        .with_json(&LoginBody {
            email: &credentials.username,
            senha: &credentials.password,
        })
        .map_err(|error| ReportError::transport(login_url, error))?;

    let response = http_client
        .execute(request)
        .await
        .map_err(|error| ReportError::transport(login_url, error))?;

    if !response.is_success() {
        return Err(ReportError::Authentication {
            status: response.status,
        });
    }

    let parsed: LoginResponse = serde_json::from_str(&response.body)
        .map_err(|error| ReportError::decode(login_url, error))?;
    if parsed.data.token.is_empty() {
        return Err(ReportError::decode(login_url, "login response carried an empty token"));
    }

    info!("authenticated against upstream");
    Ok(AccessToken(parsed.data.token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ScriptedHttpClient;
    use serde_json::json;

    fn credentials() -> Credentials {
        Credentials::new("ops@example.test", "s3cret")
    }

    #[tokio::test]
    async fn posts_email_and_senha_and_reads_nested_token() {
        let client = ScriptedHttpClient::new();
        client.push_json(json!({"data": {"token": "tok-1"}}));

        let token = authenticate(&client, "https://api.test/login", &credentials(), 1_000)
            .await
            .expect("login succeeds");

        assert_eq!(token.as_str(), "tok-1");
        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].json_body(),
            Some(json!({"email": "ops@example.test", "senha": "s3cret"}))
        );
    }

    #[tokio::test]
    async fn rejected_login_is_not_retried() {
        let client = ScriptedHttpClient::new();
        client.push_status(401);
        client.push_json(json!({"data": {"token": "never"}}));

        let error = authenticate(&client, "https://api.test/login", &credentials(), 1_000)
            .await
            .expect_err("login rejected");

        assert!(matches!(error, ReportError::Authentication { status: 401 }));
        assert_eq!(client.request_count(), 1);
    }

    #[tokio::test]
    async fn missing_token_is_a_decode_error() {
        let client = ScriptedHttpClient::new();
        client.push_json(json!({"data": {}}));

        let error = authenticate(&client, "https://api.test/login", &credentials(), 1_000)
            .await
            .expect_err("no token");

        assert!(matches!(error, ReportError::Decode { .. }));
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let rendered = format!("{:?} {:?}", credentials(), AccessToken::new("tok"));
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("tok\""));
    }
}
