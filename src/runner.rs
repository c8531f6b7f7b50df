//! Executes one scenario against a fresh session and classifies the result.

use std::fmt;

use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::auth::AuthToken;
use crate::config::{HarnessConfig, Limits, Timeouts};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::scenario::{Scenario, Step};
use crate::session::SessionClient;

/// Longest message excerpt written to the progress log.
pub const PREVIEW_CHARS: usize = 100;

/// Builds unconnected sessions for an endpoint.
#[derive(Debug, Clone)]
pub struct SessionFactory {
    ws_base: Url,
    timeouts: Timeouts,
    limits: Limits,
}

impl SessionFactory {
    pub fn new(ws_base: Url, timeouts: Timeouts, limits: Limits) -> Self {
        Self {
            ws_base,
            timeouts,
            limits,
        }
    }

    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if `config.ws_url` does not parse.
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Ok(Self::new(
            Url::parse(&config.ws_url)?,
            config.timeouts.clone(),
            config.limits.clone(),
        ))
    }

    pub fn create(&self, endpoint: Endpoint) -> Result<SessionClient> {
        Ok(SessionClient::new(
            endpoint.url(&self.ws_base)?,
            self.timeouts.clone(),
            self.limits.clone(),
        ))
    }
}

/// Where a scenario stood when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    BeforeTerminate,
    AfterTerminate,
}

/// How a scenario error is reported. None of these fail the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The session broke before it was severed.
    PreDisconnect,
    /// Transport-closed error after the abrupt terminate.
    ExpectedDisconnect,
    /// Any other error after the abrupt terminate.
    Unrelated,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorClass::PreDisconnect => "pre-disconnect",
            ErrorClass::ExpectedDisconnect => "expected-disconnect",
            ErrorClass::Unrelated => "unrelated",
        })
    }
}

/// Result of one scenario execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed {
        /// Messages drained across all receive steps.
        received: usize,
    },
    Errored {
        phase: Phase,
        /// Name of the step that failed.
        step: &'static str,
        error: Error,
    },
}

impl Outcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }

    /// `None` for a completed scenario.
    #[must_use]
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Outcome::Completed { .. } => None,
            Outcome::Errored { phase, error, .. } => Some(classify(*phase, error)),
        }
    }
}

fn classify(phase: Phase, error: &Error) -> ErrorClass {
    match phase {
        Phase::BeforeTerminate => ErrorClass::PreDisconnect,
        Phase::AfterTerminate if error.is_disconnect() => ErrorClass::ExpectedDisconnect,
        Phase::AfterTerminate => ErrorClass::Unrelated,
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed { received } => write!(f, "completed ({} messages)", received),
            Outcome::Errored { phase, step, error } => {
                write!(f, "{} at {}: {}", classify(*phase, error), step, error)
            }
        }
    }
}

/// Runs scenarios with a shared token. Cheap to clone into tasks.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    factory: SessionFactory,
    token: AuthToken,
}

impl ScenarioRunner {
    pub fn new(factory: SessionFactory, token: AuthToken) -> Self {
        Self { factory, token }
    }

    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    /// Execute `scenario` on a new session. Never fails; see [`Outcome`].
    ///
    /// The session is always severed abruptly before this returns, whether
    /// or not the scenario has its own terminate step.
    pub async fn run(&self, scenario: &Scenario) -> Outcome {
        let span = info_span!("scenario", name = scenario.name());
        self.execute(scenario).instrument(span).await
    }

    /// Like [`ScenarioRunner::run`], tagging the log span with a client id.
    pub async fn run_client(&self, scenario: &Scenario, client: usize) -> Outcome {
        let span = info_span!("client", name = scenario.name(), id = client);
        self.execute(scenario).instrument(span).await
    }

    async fn execute(&self, scenario: &Scenario) -> Outcome {
        let mut session = match self.factory.create(scenario.endpoint()) {
            Ok(session) => session,
            Err(error) => return report(Phase::BeforeTerminate, Step::Connect.name(), error),
        };

        let mut received = 0;
        let terminate = scenario.terminate_index();
        for (index, step) in scenario.steps().iter().enumerate() {
            if let Err(error) = self.step(&mut session, scenario, step, &mut received).await {
                session.abrupt_terminate();
                let phase = match terminate {
                    Some(at) if index > at => Phase::AfterTerminate,
                    _ => Phase::BeforeTerminate,
                };
                return report(phase, step.name(), error);
            }
        }

        session.abrupt_terminate();
        debug!(received, "scenario completed");
        Outcome::Completed { received }
    }

    async fn step(
        &self,
        session: &mut SessionClient,
        scenario: &Scenario,
        step: &Step,
        received: &mut usize,
    ) -> Result<()> {
        debug!(step = step.name(), state = %session.state(), "step");
        match step {
            Step::Connect => session.connect().await,
            Step::Authenticate => session.authenticate(&self.token).await,
            Step::Subscribe => {
                session
                    .subscribe(&scenario.endpoint().subscribe_message())
                    .await
            }
            Step::Send(message) => session.send(message).await,
            Step::Recv { count, timeout } => {
                let mut drain = session.drain(*count, *timeout)?;
                while let Some(message) = drain.next().await? {
                    *received += 1;
                    info!("received: {}", message.preview(PREVIEW_CHARS));
                }
                Ok(())
            }
            Step::Wait(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(())
            }
            Step::AbruptTerminate => {
                session.abrupt_terminate();
                Ok(())
            }
        }
    }
}

fn report(phase: Phase, step: &'static str, error: Error) -> Outcome {
    let outcome = Outcome::Errored { phase, step, error };
    match outcome.class() {
        Some(ErrorClass::ExpectedDisconnect) => info!("{}", outcome),
        _ => warn!("{}", outcome),
    }
    outcome
}
