//! The target's WebSocket routes.

use std::fmt;

use serde_json::json;
use url::Url;

use crate::error::Result;
use crate::message::ClientMessage;

/// A `/ws/*` route and the subscribe message it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Terminal,
    Metrics,
    Logs,
}

impl Endpoint {
    #[must_use]
    pub const fn route(&self) -> &'static str {
        match self {
            Endpoint::Terminal => "/ws/terminal",
            Endpoint::Metrics => "/ws/metrics",
            Endpoint::Logs => "/ws/logs",
        }
    }

    #[must_use]
    pub const fn channel(&self) -> &'static str {
        match self {
            Endpoint::Terminal => "terminal",
            Endpoint::Metrics => "metrics",
            Endpoint::Logs => "logs",
        }
    }

    /// The subscribe envelope for this route. Logs asks for the last 10 lines.
    #[must_use]
    pub fn subscribe_message(&self) -> ClientMessage {
        match self {
            Endpoint::Logs => ClientMessage::subscribe_with(self.channel(), json!({ "lines": 10 })),
            _ => ClientMessage::subscribe(self.channel()),
        }
    }

    /// Join the route onto a `ws://host:port` base.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the join fails.
    pub fn url(&self, ws_base: &Url) -> Result<Url> {
        Ok(ws_base.join(self.route())?)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_and_channels() {
        for endpoint in [Endpoint::Terminal, Endpoint::Metrics, Endpoint::Logs] {
            assert_eq!(endpoint.route(), format!("/ws/{}", endpoint.channel()));
        }
    }

    #[test]
    fn test_logs_subscribe_carries_options() {
        assert_eq!(
            Endpoint::Logs.subscribe_message(),
            ClientMessage::subscribe_with("logs", json!({"lines": 10}))
        );
        assert_eq!(
            Endpoint::Metrics.subscribe_message(),
            ClientMessage::subscribe("metrics")
        );
    }

    #[test]
    fn test_url_join() {
        let base = Url::parse("ws://localhost:8080").unwrap();
        assert_eq!(
            Endpoint::Terminal.url(&base).unwrap().as_str(),
            "ws://localhost:8080/ws/terminal"
        );

        let with_path = Url::parse("ws://localhost:8080/ignored").unwrap();
        assert_eq!(
            Endpoint::Metrics.url(&with_path).unwrap().as_str(),
            "ws://localhost:8080/ws/metrics"
        );
    }
}
