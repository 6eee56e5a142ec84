//! Periodic stats reporter
//!
//! Emits an [`AgentStats`] snapshot via `tracing` at the configured
//! interval, in human or JSON form. Runs as a task until cancelled.

use std::fmt::Write;
use std::sync::Arc;

use roost_config::{MetricsConfig, MetricsFormat};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{AgentStats, StatsSnapshot};

/// Periodic reporter over a shared [`AgentStats`] block.
pub struct StatsReporter {
    config: MetricsConfig,
    stats: Arc<AgentStats>,
}

impl StatsReporter {
    pub fn new(config: MetricsConfig, stats: Arc<AgentStats>) -> Self {
        Self { config, stats }
    }

    /// Run the reporter until cancellation. Spawn as a task.
    pub async fn run(self, cancel: CancellationToken) {
        if !self.config.enabled {
            info!("stats reporting disabled");
            return;
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; skip it so the first
        // report carries a full interval of data.
        ticker.tick().await;

        info!(
            interval_secs = self.config.interval.as_secs(),
            format = ?self.config.format,
            "stats reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.report();
                }
            }
        }

        // Final snapshot on the way out.
        self.report();
        info!("stats reporter stopped");
    }

    fn report(&self) {
        let snapshot = self.stats.snapshot();
        match self.config.format {
            MetricsFormat::Human => info!("{}", format_human(&snapshot)),
            MetricsFormat::Json => match serde_json::to_string(&snapshot) {
                Ok(json) => info!(target: "roost::stats", "{}", json),
                Err(e) => tracing::warn!(error = %e, "failed to serialize stats"),
            },
        }
    }
}

/// Render a snapshot as a single human-readable line.
fn format_human(s: &StatsSnapshot) -> String {
    let mut out = String::with_capacity(192);
    let _ = write!(
        out,
        "stats: received={} stored={} dropped={} validation_errors={} \
         storage_errors={} reconnects={} buffer={:.1}% uptime={}s",
        s.messages_received,
        s.messages_stored,
        s.messages_dropped,
        s.validation_errors,
        s.storage_errors,
        s.broker_reconnects,
        s.buffer_usage_percent,
        s.uptime_seconds,
    );
    if s.free_memory_bytes > 0 {
        let _ = write!(out, " free_mem={}MB", s.free_memory_bytes / (1024 * 1024));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_human() {
        let snapshot = StatsSnapshot {
            messages_received: 12,
            messages_stored: 10,
            messages_dropped: 2,
            validation_errors: 1,
            storage_errors: 0,
            broker_reconnects: 3,
            uptime_seconds: 61,
            free_memory_bytes: 512 * 1024 * 1024,
            buffer_usage_percent: 12.5,
        };

        let line = format_human(&snapshot);
        assert!(line.contains("received=12"));
        assert!(line.contains("stored=10"));
        assert!(line.contains("dropped=2"));
        assert!(line.contains("buffer=12.5%"));
        assert!(line.contains("free_mem=512MB"));
    }

    #[test]
    fn test_format_human_omits_zero_memory() {
        let snapshot = StatsSnapshot::default();
        assert!(!format_human(&snapshot).contains("free_mem"));
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let snapshot = StatsSnapshot {
            messages_received: 5,
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"messages_received\":5"));
    }

    #[tokio::test]
    async fn test_reporter_stops_on_cancel() {
        let config = MetricsConfig {
            enabled: true,
            interval: Duration::from_millis(10),
            ..Default::default()
        };
        let stats = Arc::new(AgentStats::new(10));
        let reporter = StatsReporter::new(config, stats);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(reporter.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reporter did not stop")
            .unwrap();
    }
}
