//! WebSocket connection management and the session state machine.
//!
//! [`Connection`] is the message layer over an upgraded stream. The
//! [`SessionState`] machine is driven by [`SessionClient`](crate::SessionClient),
//! which owns exactly one `Connection` over a raw TCP socket.

mod role;
mod state;

#[allow(clippy::module_inception)]
mod connection;

pub use connection::Connection;
pub use role::Role;
pub use state::SessionState;
