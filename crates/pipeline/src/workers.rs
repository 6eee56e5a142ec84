//! Worker scheduler
//!
//! Three cooperating tasks share the supervisor: the broker worker
//! pumps the MQTT event loop and feeds the ingest path, the drain
//! worker moves buffered messages into storage one at a time, and the
//! watchdog runs periodic health checks. One cancellation token stops
//! all three; every wait in the loops is bounded, so shutdown is
//! observed promptly even mid-reconnect.

use std::sync::Arc;

use roost_broker::{BrokerClient, BrokerEvent};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::status::AgentStatus;
use crate::supervisor::Supervisor;

/// Join handles for the three pipeline workers.
pub struct WorkerHandles {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerHandles {
    /// Wait for all workers to finish. Call after cancelling the token.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Create the broker client and spawn the three workers.
///
/// The supervisor gets the client handle for its subscribe API; the
/// client itself moves into the broker worker, which is the only task
/// pumping network I/O.
pub fn spawn_workers(supervisor: Arc<Supervisor>, cancel: CancellationToken) -> WorkerHandles {
    let client = BrokerClient::new(&supervisor.config().broker);
    supervisor.attach_broker(client.handle());

    let broker = tokio::spawn(broker_worker(
        Arc::clone(&supervisor),
        client,
        cancel.clone(),
    ));
    let drain = tokio::spawn(drain_worker(Arc::clone(&supervisor), cancel.clone()));
    let watchdog = tokio::spawn(watchdog_worker(supervisor, cancel));

    WorkerHandles {
        handles: vec![broker, drain, watchdog],
    }
}

/// Pump the MQTT event loop; reconnect rate-limited on failure.
async fn broker_worker(
    supervisor: Arc<Supervisor>,
    mut client: BrokerClient,
    cancel: CancellationToken,
) {
    let broker = &supervisor.config().broker;
    tracing::info!(host = %broker.host, port = broker.port, "broker worker started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            polled = client.poll() => match polled {
                Ok(Some(BrokerEvent::Connected)) => {
                    supervisor.on_broker_connected().await;
                }
                Ok(Some(BrokerEvent::Message { topic, payload })) => {
                    supervisor.handle_message(&topic, &payload).await;
                }
                Ok(Some(BrokerEvent::Disconnected)) => {
                    tracing::info!("broker disconnected");
                    supervisor.set_status(AgentStatus::BrokerConnecting);
                }
                Ok(None) => {}
                Err(e) => {
                    supervisor.set_status(AgentStatus::Error);
                    tracing::warn!(error = %e, "broker connection failed");

                    // The next poll starts a fresh connect; hold off so
                    // attempts stay at least reconnect_delay apart.
                    let delay = supervisor.config().broker.reconnect_delay;
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(delay) => {}
                    }
                    supervisor.set_status(AgentStatus::BrokerConnecting);
                }
            }
        }
    }

    tracing::info!("broker worker stopped");
}

/// Move one buffered message per tick into the storage sink.
async fn drain_worker(supervisor: Arc<Supervisor>, cancel: CancellationToken) {
    let interval = supervisor.config().pipeline.drain_interval;
    tracing::info!(interval_ms = interval.as_millis() as u64, "drain worker started");

    loop {
        supervisor.drain_once().await;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }

    tracing::info!("drain worker stopped");
}

/// Periodic health inspection.
async fn watchdog_worker(supervisor: Arc<Supervisor>, cancel: CancellationToken) {
    let interval = supervisor.config().health.check_interval;
    tracing::info!(interval_secs = interval.as_secs(), "watchdog started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {
                supervisor.update();
                supervisor.health_check().await;
            }
        }
    }

    tracing::info!("watchdog stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use roost_config::Config;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.base_path = dir
            .path()
            .join("telemetry")
            .to_string_lossy()
            .into_owned();
        config.storage.flush_interval = Duration::from_millis(5);
        config.pipeline.drain_interval = Duration::from_millis(2);
        // Keep reconnect churn quiet while the test runs.
        config.broker.port = 18_830;
        config.broker.reconnect_delay = Duration::from_secs(60);
        config
    }

    #[tokio::test]
    async fn test_workers_stop_on_cancel() {
        let dir = TempDir::new().unwrap();
        let supervisor = Arc::new(Supervisor::new(test_config(&dir)));
        supervisor.begin().await;

        let cancel = CancellationToken::new();
        let handles = spawn_workers(Arc::clone(&supervisor), cancel.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), handles.join())
            .await
            .expect("workers did not stop after cancel");
    }

    #[tokio::test]
    async fn test_drain_worker_moves_messages_to_storage() {
        let dir = TempDir::new().unwrap();
        let supervisor = Arc::new(Supervisor::new(test_config(&dir)));
        supervisor.begin().await;

        let cancel = CancellationToken::new();
        let handles = spawn_workers(Arc::clone(&supervisor), cancel.clone());

        for i in 0..3 {
            supervisor
                .handle_message("sensors/a", format!("{{\"n\":{}}}", i).as_bytes())
                .await;
        }

        // Three messages at one per 2ms tick.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = supervisor.stats_snapshot();
        assert_eq!(snapshot.messages_received, 3);
        assert_eq!(snapshot.messages_stored, 3);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handles.join())
            .await
            .expect("workers did not stop");
        supervisor.end().await;
    }

    #[tokio::test]
    async fn test_subscribe_available_after_spawn() {
        let dir = TempDir::new().unwrap();
        let supervisor = Arc::new(Supervisor::new(test_config(&dir)));
        supervisor.begin().await;

        // Before the workers exist there is no client to talk to.
        assert!(matches!(
            supervisor.subscribe("sensors/#", 0).await,
            Err(crate::PipelineError::BrokerNotAttached)
        ));

        let cancel = CancellationToken::new();
        let handles = spawn_workers(Arc::clone(&supervisor), cancel.clone());

        // The request queues locally even while the broker is down.
        supervisor.subscribe("sensors/#", 0).await.unwrap();

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handles.join())
            .await
            .expect("workers did not stop");
    }
}
