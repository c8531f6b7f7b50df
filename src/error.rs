//! Error types for sessions and the WebSocket wire layer.
//!
//! Every failure a single session can hit is an [`Error`]. Suite-level fatal
//! conditions live in [`crate::suite::Failure`] instead.

use std::io::ErrorKind;

use thiserror::Error;

use crate::connection::SessionState;

/// Result type alias for session and wire operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a WebSocket session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Invalid frame structure or header.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Protocol violation detected.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid UTF-8 in text frame.
    #[error("Invalid UTF-8 in text frame")]
    InvalidUtf8,

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Peer closed the connection, either with a close frame or EOF.
    #[error("Connection closed: {0:?}")]
    ConnectionClosed(Option<u16>),

    /// Invalid WebSocket upgrade handshake.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Handshake response exceeded the configured size.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Could not reach the endpoint or complete the upgrade.
    #[error("Connect to {endpoint} failed: {reason}")]
    Connect {
        /// Target URL.
        endpoint: String,
        /// Underlying cause.
        reason: String,
    },

    /// The auth exchange did not produce a reply.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// An operation did not finish within its deadline.
    #[error("{operation} timed out after {millis} ms")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Deadline in milliseconds.
        millis: u64,
    },

    /// Operation is not valid in the session's current state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
    },

    /// Operation attempted after the transport was severed.
    #[error("Session terminated")]
    Terminated,

    /// A concurrent client task panicked or was cancelled.
    #[error("Client task failed: {0}")]
    TaskFailed(String),

    /// Invalid endpoint URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// I/O error occurred.
    #[error("I/O error ({kind:?}): {message}")]
    Io {
        /// Kind reported by the OS.
        kind: ErrorKind,
        /// Rendered error.
        message: String,
    },

    /// Serialization of an outgoing message failed.
    #[error("JSON error: {0}")]
    Json(String),

    /// HTTP request to the target server failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Reserved opcode used.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Control frame fragmented (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Unmasked client frame (security violation).
    #[error("Client frame must be masked")]
    UnmaskedClientFrame,

    /// Masked server frame (security violation).
    #[error("Server frame must not be masked")]
    MaskedServerFrame,

    /// Reserved bits set without extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Incomplete frame data.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },
}

impl Error {
    /// Whether this error means the transport is gone.
    ///
    /// These are the only errors that count as expected noise once a
    /// session has been abruptly terminated.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::ConnectionClosed(_) | Error::Terminated => true,
            Error::Io { kind, .. } => matches!(
                kind,
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
                    | ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}
