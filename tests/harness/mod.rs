//! Shared fixtures for integration tests: an in-process target server and
//! a harness configuration pointed at it.

#![allow(dead_code)]

mod server;

use std::net::SocketAddr;
use std::time::Duration;

use ws_resilience::{AuthToken, HarnessConfig, ScenarioRunner, SessionFactory, Timeouts};

pub use server::{PASSWORD, TOKEN, TestServer, USERNAME};

/// Defaults shortened so a full suite runs in a couple of seconds.
pub fn config(addr: SocketAddr) -> HarnessConfig {
    HarnessConfig::default()
        .with_target(&addr.to_string())
        .with_settle(Duration::from_millis(100), Duration::from_millis(200))
        .with_timeouts(Timeouts::new(
            Duration::from_secs(2),
            Duration::from_secs(2),
            Duration::from_secs(1),
            Duration::from_millis(300),
            Duration::from_secs(1),
        ))
}

pub fn runner(addr: SocketAddr) -> ScenarioRunner {
    runner_with_token(addr, TOKEN)
}

pub fn runner_with_token(addr: SocketAddr, token: &str) -> ScenarioRunner {
    let factory = SessionFactory::from_config(&config(addr)).unwrap();
    ScenarioRunner::new(factory, AuthToken::new(token))
}
