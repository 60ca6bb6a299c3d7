use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use grafana_extension::{
    config::Config,
    discovery::{AlertRuleDiscovery, TargetCache},
    grafana::{GrafanaApi, GrafanaClient},
    server::Server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::load()?;
    info!("Loaded configuration: {:?}", config);

    let grafana: Arc<dyn GrafanaApi> = Arc::new(GrafanaClient::new(&config.grafana)?);

    // Discovery refreshes in the background for the lifetime of the process
    let targets = Arc::new(TargetCache::new(AlertRuleDiscovery::new(
        grafana.clone(),
        &config.discovery,
    )));
    let refresh = targets.clone().spawn_refresh();

    let server = Server::new(grafana, targets);

    info!("Starting server on {}", config.server.addr);
    let result = tokio::select! {
        result = server.start(&config.server.addr) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };
    refresh.abort();

    Ok(result?)
}
