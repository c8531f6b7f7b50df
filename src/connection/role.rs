//! Which end of the connection a codec speaks for.

/// WebSocket connection role.
///
/// Determines masking behavior per RFC 6455 Section 5.1. The harness itself
/// is always the client; the server role backs the in-process mock target
/// used by the integration tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Masks every outgoing frame, rejects masked incoming frames.
    Client,
    /// Never masks, requires masked incoming frames.
    Server,
}

impl Role {
    #[inline]
    #[must_use]
    pub const fn must_mask(&self) -> bool {
        matches!(self, Role::Client)
    }

    #[inline]
    #[must_use]
    pub const fn expects_masked(&self) -> bool {
        matches!(self, Role::Server)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "Client"),
            Role::Server => write!(f, "Server"),
        }
    }
}
