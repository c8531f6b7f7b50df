//! # ws-resilience - abrupt WebSocket disconnect probe
//!
//! `ws-resilience` checks that a live server survives clients that vanish
//! without a close handshake. It logs in over HTTP, opens WebSocket sessions
//! to the server's terminal, metrics and logs routes, exchanges a little
//! traffic, and then resets each TCP connection with `SO_LINGER=0`. Between
//! scenarios it waits a settle delay and polls `GET /health`.
//!
//! ## Layers
//!
//! - [`protocol`], [`codec`] and [`Connection`]: a small RFC 6455 client
//!   (and test-server) implementation that keeps the raw `TcpStream` reachable
//! - [`SessionClient`]: one session and its [`SessionState`] machine
//! - [`ScenarioRunner`] and [`ConcurrentOrchestrator`]: run scenarios singly
//!   or fanned out on a `JoinSet`, turning every error into an [`Outcome`]
//! - [`TestSuite`]: health gate, login, scenarios, settle delays, [`Verdict`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ws_resilience::{HarnessConfig, TestSuite};
//!
//! let verdict = TestSuite::standard(HarnessConfig::from_env()).run_all().await;
//! std::process::exit(verdict.exit_code());
//! ```

pub mod auth;
pub mod codec;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod health;
pub mod message;
pub mod orchestrator;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod suite;

#[cfg(test)]
mod mock;

pub use auth::{AuthToken, Credentials, login};
pub use codec::WebSocketCodec;
pub use config::{HarnessConfig, Limits, Timeouts};
pub use connection::{Connection, Role, SessionState};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use health::HealthProbe;
pub use message::{ClientMessage, Message};
pub use orchestrator::{ClientOutcome, ConcurrentOrchestrator};
pub use protocol::{OpCode, WS_GUID, compute_accept_key};
pub use runner::{ErrorClass, Outcome, Phase, ScenarioRunner, SessionFactory};
pub use scenario::{Scenario, Step};
pub use session::{Drain, SessionClient};
pub use suite::{Failure, ScenarioReport, SuiteEntry, TestSuite, Verdict};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_public_types_are_send() {
        assert_send::<Error>();
        assert_send::<HarnessConfig>();
        assert_send::<AuthToken>();
        assert_send::<SessionClient>();
        assert_send::<ScenarioRunner>();
        assert_send::<Outcome>();
        assert_send::<Verdict>();
        assert_send::<Connection<tokio::net::TcpStream>>();
    }

    #[test]
    fn test_public_types_are_sync() {
        assert_sync::<Error>();
        assert_sync::<AuthToken>();
        assert_sync::<Scenario>();
        assert_sync::<ScenarioRunner>();
        assert_sync::<SessionState>();
        assert_sync::<Role>();
    }
}
