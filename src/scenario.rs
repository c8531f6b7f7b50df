//! Scenario descriptions: fixed, ordered sequences of session operations.

use std::fmt;
use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::message::ClientMessage;

/// Per-message receive deadline used by the standard scenarios.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// One session operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Connect,
    /// Send the shared token and wait for one reply.
    Authenticate,
    /// Send the endpoint's subscribe message.
    Subscribe,
    Send(ClientMessage),
    /// Drain up to `count` messages, each within `timeout`.
    Recv { count: usize, timeout: Duration },
    Wait(Duration),
    AbruptTerminate,
}

impl Step {
    /// Short name used in logs and outcomes.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Step::Connect => "connect",
            Step::Authenticate => "authenticate",
            Step::Subscribe => "subscribe",
            Step::Send(_) => "send",
            Step::Recv { .. } => "recv",
            Step::Wait(_) => "wait",
            Step::AbruptTerminate => "abrupt-terminate",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable, named list of steps against one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    name: String,
    endpoint: Endpoint,
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, endpoint: Endpoint, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            endpoint,
            steps,
        }
    }

    /// connect, authenticate, subscribe, drain `drain` messages, terminate.
    pub fn abrupt_disconnect(name: impl Into<String>, endpoint: Endpoint, drain: usize) -> Self {
        Self::new(
            name,
            endpoint,
            vec![
                Step::Connect,
                Step::Authenticate,
                Step::Subscribe,
                Step::Recv {
                    count: drain,
                    timeout: DEFAULT_RECV_TIMEOUT,
                },
                Step::AbruptTerminate,
            ],
        )
    }

    pub fn metrics_disconnect() -> Self {
        Self::abrupt_disconnect("metrics-disconnect", Endpoint::Metrics, 3)
    }

    pub fn logs_disconnect() -> Self {
        Self::abrupt_disconnect("logs-disconnect", Endpoint::Logs, 3)
    }

    /// Resize and type into the terminal before severing it.
    pub fn terminal_resize() -> Self {
        Self::new(
            "terminal-resize-disconnect",
            Endpoint::Terminal,
            vec![
                Step::Connect,
                Step::Authenticate,
                Step::Subscribe,
                Step::Wait(Duration::from_millis(500)),
                Step::Send(ClientMessage::resize(120, 40)),
                Step::Send(ClientMessage::input("echo 'test'\n")),
                Step::Recv {
                    count: 3,
                    timeout: DEFAULT_RECV_TIMEOUT,
                },
                Step::AbruptTerminate,
            ],
        )
    }

    /// The per-client template for the concurrent metrics scenario.
    pub fn parallel_metrics() -> Self {
        Self::abrupt_disconnect("parallel-metrics-disconnect", Endpoint::Metrics, 2)
    }

    /// Replace every receive deadline.
    #[must_use]
    pub fn with_recv_timeout(mut self, per_message: Duration) -> Self {
        for step in &mut self.steps {
            if let Step::Recv { timeout, .. } = step {
                *timeout = per_message;
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Index of the first abrupt-terminate step, if any.
    pub fn terminate_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| *s == Step::AbruptTerminate)
    }
}
