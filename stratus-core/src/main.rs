use std::sync::Arc;
use std::time::Duration;

use stratus_core::announcer::{DiscoveryBackend, HttpDiscoveryBackend, NoOpDiscoveryBackend};
use stratus_core::bootstrap::BootstrapSequencer;
use stratus_core::config::CoreConfig;
use stratus_core::logging;
use stratus_core::monitor::HttpHealthProbe;
use stratus_core::scheduler::NoOpScheduler;
use stratus_core::storage::ProcessSpawner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = CoreConfig::from_env_or_default();

    // Keep the guard alive so file output flushes on exit
    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;

    let discovery: Arc<dyn DiscoveryBackend> = match &config.discovery_agent {
        Some(agent) => Arc::new(HttpDiscoveryBackend::new(agent.clone())),
        None => Arc::new(NoOpDiscoveryBackend),
    };
    let probe = Arc::new(HttpHealthProbe::new(Duration::from_secs(
        config.monitor_timeout_secs,
    )));
    let spawner = Arc::new(ProcessSpawner::new(config.storage_binary.clone()));

    let sequencer =
        BootstrapSequencer::new(config, spawner, probe, discovery, Arc::new(NoOpScheduler));

    if let Err(e) = sequencer.start().await {
        tracing::error!(error = %e, "Core failed to start");
        return Err(e.into());
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    sequencer.shutdown().await;
    Ok(())
}
