//! Fan-out of one scenario across many independent clients.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::Error;
use crate::runner::{Outcome, Phase, ScenarioRunner};
use crate::scenario::Scenario;

/// Outcome of one client in a concurrent run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOutcome {
    /// Zero-based client id.
    pub client: usize,
    pub outcome: Outcome,
}

/// Runs N copies of a scenario at once and waits for all of them.
///
/// One client's failure, or even its panic, never cancels the others.
#[derive(Debug, Clone)]
pub struct ConcurrentOrchestrator {
    runner: ScenarioRunner,
}

impl ConcurrentOrchestrator {
    pub fn new(runner: ScenarioRunner) -> Self {
        Self { runner }
    }

    /// Run `template` on `client_count` fresh sessions concurrently.
    ///
    /// Returns exactly `client_count` outcomes ordered by client id.
    pub async fn run_parallel(&self, template: &Scenario, client_count: usize) -> Vec<ClientOutcome> {
        let template = Arc::new(template.clone());
        let runner = self.runner.clone();
        fan_out(client_count, move |client| {
            let runner = runner.clone();
            let scenario = Arc::clone(&template);
            async move { runner.run_client(&scenario, client).await }
        })
        .await
    }
}

/// Spawn `client_count` tasks and collect one outcome per client id.
///
/// A task that panics or is cancelled cannot report its id; its slot is
/// the one left empty and becomes `Error::TaskFailed`.
async fn fan_out<F, Fut>(client_count: usize, client_task: F) -> Vec<ClientOutcome>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for client in 0..client_count {
        let task = client_task(client);
        tasks.spawn(async move { (client, task.await) });
    }

    let mut slots: Vec<Option<Outcome>> = vec![None; client_count];
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((client, outcome)) => {
                match &outcome {
                    Outcome::Completed { .. } => {
                        info!(client, "client {} disconnected", client)
                    }
                    Outcome::Errored { .. } => info!(client, "client {} {}", client, outcome),
                }
                slots[client] = Some(outcome);
            }
            Err(err) => {
                warn!(error = %err, "client task failed");
                failures.push(err.to_string());
            }
        }
    }

    let mut failures = failures.into_iter();
    slots
        .into_iter()
        .enumerate()
        .map(|(client, slot)| ClientOutcome {
            client,
            outcome: slot.unwrap_or_else(|| Outcome::Errored {
                phase: Phase::BeforeTerminate,
                step: "task",
                error: Error::TaskFailed(failures.next().unwrap_or_else(|| "no result".to_string())),
            }),
        })
        .collect()
}
