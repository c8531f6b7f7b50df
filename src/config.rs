//! Configuration, limits and timeouts for the harness.

use std::time::Duration;

use crate::auth::Credentials;

/// Size limits applied to incoming traffic.
///
/// The server under test is untrusted from the harness's point of view; these
/// bound how much memory one misbehaving session can pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size of a single frame in bytes.
    ///
    /// Default: 16 MB
    pub max_frame_size: usize,

    /// Maximum size of a reassembled message in bytes.
    ///
    /// Default: 64 MB
    pub max_message_size: usize,

    /// Maximum size of the upgrade response headers in bytes.
    ///
    /// Default: 8 KB
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,
            max_message_size: 64 * 1024 * 1024,
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(max_frame_size: usize, max_message_size: usize, max_handshake_size: usize) -> Self {
        Self {
            max_frame_size,
            max_message_size,
            max_handshake_size,
        }
    }

    /// Validate that message size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`](crate::Error::MessageTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_message_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_message_size {
            Err(crate::Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that frame size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`](crate::Error::FrameTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_frame_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_frame_size {
            Err(crate::Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that handshake size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`](crate::Error::HandshakeTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_handshake_size {
            Err(crate::Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}

/// Per-operation deadlines.
///
/// There is no suite-level cancellation: every await point a session can
/// hang on is bounded by one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP connect.
    ///
    /// Default: 5 seconds
    pub connect: Duration,

    /// Upgrade request/response exchange.
    ///
    /// Default: 5 seconds
    pub handshake: Duration,

    /// Wait for the single reply to the auth message.
    ///
    /// Default: 5 seconds
    pub auth: Duration,

    /// Per-message receive while draining.
    ///
    /// Default: 1 second
    pub recv: Duration,

    /// Health check and login requests.
    ///
    /// Default: 2 seconds
    pub http: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            handshake: Duration::from_secs(5),
            auth: Duration::from_secs(5),
            recv: Duration::from_secs(1),
            http: Duration::from_secs(2),
        }
    }
}

impl Timeouts {
    /// Create new timeouts with custom values.
    #[must_use]
    pub const fn new(
        connect: Duration,
        handshake: Duration,
        auth: Duration,
        recv: Duration,
        http: Duration,
    ) -> Self {
        Self {
            connect,
            handshake,
            auth,
            recv,
            http,
        }
    }
}

/// Everything a suite run needs to know about its target.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Base URL of the HTTP API (login and health).
    ///
    /// Default: `http://localhost:8080`
    pub api_url: String,

    /// Base URL of the WebSocket routes.
    ///
    /// Default: `ws://localhost:8080`
    pub ws_url: String,

    /// Login credentials.
    pub credentials: Credentials,

    /// Number of clients in the concurrent disconnect scenario.
    ///
    /// Default: 10
    pub parallel_clients: usize,

    /// Pause after each single-client scenario.
    ///
    /// Default: 1 second
    pub settle: Duration,

    /// Pause after the concurrent scenario.
    ///
    /// Default: 2 seconds
    pub parallel_settle: Duration,

    /// Per-operation deadlines.
    pub timeouts: Timeouts,

    /// Incoming size limits.
    pub limits: Limits,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            ws_url: "ws://localhost:8080".to_string(),
            credentials: Credentials::new("admin", "admin123"),
            parallel_clients: 10,
            settle: Duration::from_secs(1),
            parallel_settle: Duration::from_secs(2),
            timeouts: Timeouts::default(),
            limits: Limits::default(),
        }
    }
}

impl HarnessConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `WS_RESILIENCE_*` environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("WS_RESILIENCE_API_URL") {
            config.api_url = url;
        }

        if let Ok(url) = std::env::var("WS_RESILIENCE_WS_URL") {
            config.ws_url = url;
        }

        let username = std::env::var("WS_RESILIENCE_USERNAME").ok();
        let password = std::env::var("WS_RESILIENCE_PASSWORD").ok();
        if username.is_some() || password.is_some() {
            config.credentials = Credentials::new(
                username.unwrap_or_else(|| config.credentials.username().to_string()),
                password.unwrap_or_else(|| config.credentials.password().to_string()),
            );
        }

        if let Ok(val) = std::env::var("WS_RESILIENCE_CLIENTS") {
            if let Ok(parsed) = val.parse() {
                config.parallel_clients = parsed;
            }
        }

        if let Ok(val) = std::env::var("WS_RESILIENCE_HEALTH_TIMEOUT_MS") {
            if let Ok(parsed) = val.parse() {
                config.timeouts.http = Duration::from_millis(parsed);
            }
        }

        if let Ok(val) = std::env::var("WS_RESILIENCE_RECV_TIMEOUT_MS") {
            if let Ok(parsed) = val.parse() {
                config.timeouts.recv = Duration::from_millis(parsed);
            }
        }

        config
    }

    /// Point both the HTTP API and the WebSocket routes at `host:port`.
    #[must_use]
    pub fn with_target(mut self, authority: &str) -> Self {
        self.api_url = format!("http://{}", authority);
        self.ws_url = format!("ws://{}", authority);
        self
    }

    /// Set login credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the client count for the concurrent scenario.
    #[must_use]
    pub fn with_parallel_clients(mut self, count: usize) -> Self {
        self.parallel_clients = count;
        self
    }

    /// Set both settle delays.
    #[must_use]
    pub fn with_settle(mut self, single: Duration, parallel: Duration) -> Self {
        self.settle = single;
        self.parallel_settle = parallel;
        self
    }

    /// Set custom timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set custom limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
