//! Login against the target's HTTP API.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Username/password pair posted to `/auth/login`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bearer token returned by login, shared read-only by every session.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(Arc<str>);

impl AuthToken {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(<{} chars>)", self.0.len())
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    data: Option<LoginData>,
}

#[derive(Deserialize)]
struct LoginData {
    token: Option<String>,
}

/// POST `credentials` to `{api_url}/auth/login` and extract `data.token`.
///
/// The request timeout is whatever `client` was built with.
///
/// # Errors
///
/// - `Error::Http` if the request cannot be sent or the body is not JSON
/// - `Error::Auth` for a non-2xx status or a response without a token
pub async fn login(
    client: &reqwest::Client,
    api_url: &str,
    credentials: &Credentials,
) -> Result<AuthToken> {
    let url = format!("{}/auth/login", api_url.trim_end_matches('/'));
    debug!(%url, username = credentials.username(), "logging in");

    let response = client.post(&url).json(credentials).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Auth(format!("login returned {}", status)));
    }

    let body: LoginResponse = response.json().await?;
    body.data
        .and_then(|data| data.token)
        .filter(|token| !token.is_empty())
        .map(AuthToken::new)
        .ok_or_else(|| Error::Auth("login response has no data.token".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_serialize() {
        let creds = Credentials::new("admin", "admin123");
        assert_eq!(
            serde_json::to_value(&creds).unwrap(),
            serde_json::json!({"username": "admin", "password": "admin123"})
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::new("admin", "admin123");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("admin123"));

        let token = AuthToken::new("secret-token");
        assert!(!format!("{:?}", token).contains("secret"));
    }

    #[test]
    fn test_token_clones_share_storage() {
        let token = AuthToken::new("abc");
        let clone = token.clone();
        assert!(std::ptr::eq(token.as_str(), clone.as_str()));
    }

    #[test]
    fn test_login_response_shapes() {
        let ok: LoginResponse = serde_json::from_str(r#"{"data":{"token":"t"}}"#).unwrap();
        assert_eq!(ok.data.and_then(|d| d.token).as_deref(), Some("t"));

        let missing: LoginResponse = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert!(missing.data.is_none());
    }
}
