//! The `serve` command: run the agent until interrupted.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use roost_config::Config;
use roost_metrics::StatsReporter;
use roost_pipeline::{spawn_workers, Supervisor};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the agent: supervisor, workers, reporter, signal-driven shutdown.
pub async fn run(config_path: &Path, config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        broker = %format!("{}:{}", config.broker.host, config.broker.port),
        storage = %config.storage.base_path,
        subscriptions = config.broker.subscriptions.len(),
        "roost starting"
    );

    if config.broker.subscriptions.is_empty() {
        tracing::warn!("no subscriptions configured; the agent will idle until subscribe() is called");
    }

    let supervisor = Arc::new(Supervisor::new(config));
    supervisor.begin().await;

    let cancel = CancellationToken::new();
    let workers = spawn_workers(Arc::clone(&supervisor), cancel.clone());

    let reporter = StatsReporter::new(supervisor.config().metrics.clone(), supervisor.stats());
    let reporter_handle = tokio::spawn(reporter.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    cancel.cancel();
    workers.join().await;
    let _ = reporter_handle.await;
    supervisor.end().await;

    let snapshot = supervisor.stats_snapshot();
    info!(
        received = snapshot.messages_received,
        stored = snapshot.messages_stored,
        dropped = snapshot.messages_dropped,
        uptime_secs = snapshot.uptime_seconds,
        "roost stopped"
    );

    Ok(())
}
