//! The full run: health gate, login, scenarios with settle delays, verdict.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::auth::login;
use crate::config::HarnessConfig;
use crate::error::Error;
use crate::health::HealthProbe;
use crate::orchestrator::ConcurrentOrchestrator;
use crate::runner::{ErrorClass, Outcome, ScenarioRunner, SessionFactory};
use crate::scenario::Scenario;

/// One entry in the suite, with the pause that follows it.
#[derive(Debug, Clone)]
pub enum SuiteEntry {
    Single {
        scenario: Scenario,
        settle: Duration,
    },
    Parallel {
        template: Scenario,
        clients: usize,
        settle: Duration,
    },
}

impl SuiteEntry {
    pub fn name(&self) -> &str {
        match self {
            SuiteEntry::Single { scenario, .. } => scenario.name(),
            SuiteEntry::Parallel { template, .. } => template.name(),
        }
    }

    pub fn settle(&self) -> Duration {
        match self {
            SuiteEntry::Single { settle, .. } | SuiteEntry::Parallel { settle, .. } => *settle,
        }
    }
}

/// Per-scenario tally of outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub index: usize,
    pub name: String,
    pub outcomes: Vec<Outcome>,
}

impl ScenarioReport {
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    pub fn count(&self, class: ErrorClass) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.class() == Some(class))
            .count()
    }
}

/// Conditions that fail the suite.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Failure {
    #[error("server at {url} is not healthy; start it before running the suite")]
    ServerUnreachable { url: String },

    #[error("login failed: {0}")]
    LoginFailed(Error),

    #[error("server unhealthy after scenario {} ({name}); it may have crashed", .index + 1)]
    HealthCheckFailed { index: usize, name: String },

    #[error("suite setup failed: {0}")]
    Setup(Error),
}

/// Aggregate result of [`TestSuite::run_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub reports: Vec<ScenarioReport>,
    pub failure: Option<Failure>,
}

impl Verdict {
    fn failed(reports: Vec<ScenarioReport>, failure: Failure) -> Self {
        error!("{}", failure);
        Self {
            reports,
            failure: Some(failure),
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    /// Process exit status: 0 on pass, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }
}

/// Ordered scenarios interleaved with health checks.
#[derive(Debug, Clone)]
pub struct TestSuite {
    config: HarnessConfig,
    entries: Vec<SuiteEntry>,
}

impl TestSuite {
    pub fn new(config: HarnessConfig, entries: Vec<SuiteEntry>) -> Self {
        Self { config, entries }
    }

    /// Metrics, logs and terminal disconnects, then the concurrent metrics run.
    pub fn standard(config: HarnessConfig) -> Self {
        let recv = config.timeouts.recv;
        let single = |scenario: Scenario| SuiteEntry::Single {
            scenario: scenario.with_recv_timeout(recv),
            settle: config.settle,
        };
        let entries = vec![
            single(Scenario::metrics_disconnect()),
            single(Scenario::logs_disconnect()),
            single(Scenario::terminal_resize()),
            SuiteEntry::Parallel {
                template: Scenario::parallel_metrics().with_recv_timeout(recv),
                clients: config.parallel_clients,
                settle: config.parallel_settle,
            },
        ];
        Self::new(config, entries)
    }

    pub fn entries(&self) -> &[SuiteEntry] {
        &self.entries
    }

    /// Run every entry in order; stop at the first failed health check.
    pub async fn run_all(&self) -> Verdict {
        let mut reports = Vec::with_capacity(self.entries.len());

        let client = match reqwest::Client::builder()
            .timeout(self.config.timeouts.http)
            .build()
        {
            Ok(client) => client,
            Err(err) => return Verdict::failed(reports, Failure::Setup(err.into())),
        };
        let probe = HealthProbe::with_client(client.clone(), &self.config.api_url);

        info!(url = %probe.url(), "checking server health");
        if !probe.check().await {
            let url = self.config.api_url.clone();
            return Verdict::failed(reports, Failure::ServerUnreachable { url });
        }
        info!("server is healthy");

        let token = match login(&client, &self.config.api_url, &self.config.credentials).await {
            Ok(token) => token,
            Err(err) => return Verdict::failed(reports, Failure::LoginFailed(err)),
        };
        info!("logged in");

        let factory = match SessionFactory::from_config(&self.config) {
            Ok(factory) => factory,
            Err(err) => return Verdict::failed(reports, Failure::Setup(err)),
        };
        let runner = ScenarioRunner::new(factory, token);
        let orchestrator = ConcurrentOrchestrator::new(runner.clone());

        let total = self.entries.len();
        for (index, entry) in self.entries.iter().enumerate() {
            info!("[{}/{}] {}", index + 1, total, entry.name());

            let outcomes = match entry {
                SuiteEntry::Single { scenario, .. } => vec![runner.run(scenario).await],
                SuiteEntry::Parallel {
                    template, clients, ..
                } => {
                    info!(clients, "spawning concurrent clients");
                    orchestrator
                        .run_parallel(template, *clients)
                        .await
                        .into_iter()
                        .map(|c| c.outcome)
                        .collect()
                }
            };

            let report = ScenarioReport {
                index,
                name: entry.name().to_string(),
                outcomes,
            };
            log_report(&report);
            reports.push(report);

            tokio::time::sleep(entry.settle()).await;
            if !probe.check().await {
                let failure = Failure::HealthCheckFailed {
                    index,
                    name: entry.name().to_string(),
                };
                return Verdict::failed(reports, failure);
            }
            info!("server still healthy after {}", entry.name());
        }

        info!("all {} scenarios passed; server survived abrupt disconnects", total);
        info!("check the server logs for any unhandled panics");
        Verdict {
            reports,
            failure: None,
        }
    }
}

fn log_report(report: &ScenarioReport) {
    let pre = report.count(ErrorClass::PreDisconnect);
    let unrelated = report.count(ErrorClass::Unrelated);
    let summary = format!(
        "{}: {} completed, {} expected-disconnect, {} pre-disconnect, {} unrelated",
        report.name,
        report.completed(),
        report.count(ErrorClass::ExpectedDisconnect),
        pre,
        unrelated,
    );
    if pre + unrelated > 0 {
        warn!("{}", summary);
    } else {
        info!("{}", summary);
    }
}
