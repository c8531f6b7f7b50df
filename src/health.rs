//! Liveness gate for the target server.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;

/// Bounded `GET /health` against the target's HTTP API.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: reqwest::Client,
    url: String,
}

impl HealthProbe {
    /// Build a probe for `{api_url}/health` with its own request timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be constructed.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Reuse an existing client; its timeout applies.
    pub fn with_client(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/health", api_url.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// True only for a 200 response; every other outcome is false.
    pub async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                debug!(url = %self.url, "health ok");
                true
            }
            Ok(response) => {
                warn!(url = %self.url, status = %response.status(), "health check returned non-200");
                false
            }
            Err(err) => {
                warn!(url = %self.url, error = %err, "health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_url() {
        let probe = HealthProbe::new("http://localhost:8080/", Duration::from_secs(2)).unwrap();
        assert_eq!(probe.url(), "http://localhost:8080/health");
    }

    #[tokio::test]
    async fn test_unreachable_is_false() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = HealthProbe::new(&format!("http://{}", addr), Duration::from_millis(500)).unwrap();
        assert!(!probe.check().await);
    }
}
