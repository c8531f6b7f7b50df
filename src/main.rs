use tracing_subscriber::EnvFilter;
use ws_resilience::{HarnessConfig, TestSuite};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ws_resilience=info")),
        )
        .with_target(false)
        .init();

    let config = HarnessConfig::from_env();
    tracing::info!(
        api = %config.api_url,
        ws = %config.ws_url,
        clients = config.parallel_clients,
        "starting abrupt disconnect suite"
    );

    let verdict = TestSuite::standard(config).run_all().await;
    if let Some(failure) = &verdict.failure {
        eprintln!("FAILED: {}", failure);
    }
    std::process::exit(verdict.exit_code());
}
