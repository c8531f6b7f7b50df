//! Per-session lifecycle state machine.

/// Lifecycle of one [`SessionClient`](crate::SessionClient).
///
/// ```text
/// Disconnected -> Connected -> Authenticated -> Subscribed
///                      \              \              \
///                       +--------------+--------------+--> Terminated
/// ```
///
/// `Terminated` is reached only through an abrupt terminate and is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No transport yet.
    #[default]
    Disconnected,
    /// Upgrade handshake completed.
    Connected,
    /// Auth message sent and one reply received.
    Authenticated,
    /// Subscribe message sent.
    Subscribed,
    /// Raw socket severed.
    Terminated,
}

impl SessionState {
    /// Whether a transport is currently held.
    #[must_use]
    #[inline]
    pub const fn has_transport(&self) -> bool {
        matches!(
            self,
            SessionState::Connected | SessionState::Authenticated | SessionState::Subscribed
        )
    }

    /// Raw payloads may be sent once the session is authenticated.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, SessionState::Authenticated | SessionState::Subscribed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "Disconnected"),
            SessionState::Connected => write!(f, "Connected"),
            SessionState::Authenticated => write!(f, "Authenticated"),
            SessionState::Subscribed => write!(f, "Subscribed"),
            SessionState::Terminated => write!(f, "Terminated"),
        }
    }
}
