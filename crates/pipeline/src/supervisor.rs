//! Pipeline coordinator
//!
//! One `Supervisor` value owns every shared resource; workers hold an
//! `Arc` and go through its methods, so all mutual exclusion lives
//! here. There are no ambient globals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use roost_broker::{BrokerError, ClientHandle};
use roost_buffer::RingBuffer;
use roost_config::Config;
use roost_metrics::{free_memory_bytes, AgentStats, StatsSnapshot};
use roost_schema::SchemaValidator;
use roost_storage::{SinkConfig, StorageSink};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::status::{AgentStatus, StatusCell};

/// How long the ingest and drain paths wait for the buffer mutex. A
/// timed-out ingest drops the message; a timed-out drain retries on its
/// next tick.
pub(crate) const BUFFER_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// Bound on waiting for the storage lock inside the health check, so a
/// stalled write cannot stall the watchdog.
const HEALTH_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// User callback invoked for every inbound message before validation.
pub type MessageCallback = Box<dyn Fn(&str, &[u8]) + Send + Sync>;

/// User callback invoked with a short description and a negative code
/// when a component fails.
pub type ErrorCallback = Box<dyn Fn(&str, i32) + Send + Sync>;

const ERR_STORAGE_INIT: i32 = -4;
const ERR_STORAGE_WRITE: i32 = -5;

/// Errors surfaced by the supervisor's public control API.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Workers have not been spawned yet, so no broker client exists.
    #[error("broker client not attached")]
    BrokerNotAttached,

    /// The broker client rejected the request.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Owner of the pipeline's shared state.
///
/// Construction is cheap and offline apart from reading the schema
/// file; [`begin`](Self::begin) performs storage initialization and
/// walks the startup status transitions. Callbacks must be registered
/// before the supervisor is shared with the workers.
pub struct Supervisor {
    config: Config,
    buffer: Mutex<RingBuffer>,
    sink: Mutex<StorageSink>,
    validator: SchemaValidator,
    stats: Arc<AgentStats>,
    status: StatusCell,
    sink_ready: AtomicBool,
    broker: OnceLock<ClientHandle>,
    message_callback: Option<MessageCallback>,
    error_callback: Option<ErrorCallback>,
}

impl Supervisor {
    /// Build the supervisor from a validated configuration.
    ///
    /// A schema that fails to load is logged once and validation is
    /// skipped from then on; ingest proceeds without it.
    pub fn new(config: Config) -> Self {
        let mut validator = SchemaValidator::new();
        validator.set_enabled(config.schema.validation_enabled);

        if let Some(path) = &config.schema.path {
            match validator.load_from_file(path) {
                Ok(()) => {
                    let name = validator
                        .schema()
                        .map(|schema| schema.name.clone())
                        .unwrap_or_default();
                    tracing::info!(path = %path, schema = %name, "schema loaded");
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "failed to load schema, continuing without validation");
                }
            }
        }

        let capacity = config.buffer.capacity;
        let sink_config = SinkConfig {
            base_path: config.storage.base_path.clone().into(),
            prefix: config.storage.prefix.clone(),
            extension: config.storage.extension.clone(),
            max_file_size: config.storage.max_file_size(),
            flush_interval: config.storage.flush_interval,
        };

        Self {
            config,
            buffer: Mutex::new(RingBuffer::new(capacity)),
            sink: Mutex::new(StorageSink::new(sink_config)),
            validator,
            stats: Arc::new(AgentStats::new(capacity)),
            status: StatusCell::new(AgentStatus::Initializing),
            sink_ready: AtomicBool::new(false),
            broker: OnceLock::new(),
            message_callback: None,
            error_callback: None,
        }
    }

    /// Register a callback invoked for every inbound message.
    pub fn set_message_callback(&mut self, callback: MessageCallback) {
        self.message_callback = Some(callback);
    }

    /// Register a callback invoked on component failures.
    pub fn set_error_callback(&mut self, callback: ErrorCallback) {
        self.error_callback = Some(callback);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared stats block, e.g. for the reporter.
    pub fn stats(&self) -> Arc<AgentStats> {
        Arc::clone(&self.stats)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> AgentStatus {
        self.status.load()
    }

    /// Point-in-time stats snapshot, by value.
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Operator command: zero the monotonic counters.
    pub fn reset_stats(&self) {
        self.stats.reset();
        tracing::info!("statistics reset");
    }

    /// Storage sink statistics, by value.
    pub async fn storage_stats(&self) -> roost_storage::StorageStats {
        self.sink.lock().await.stats()
    }

    /// Initialize storage and walk the startup transitions.
    ///
    /// A storage failure is non-fatal: the broker keeps ingesting into
    /// the ring and the status reports `StorageError` until the drain
    /// path recovers.
    pub async fn begin(&self) {
        self.status.store(AgentStatus::LinkConnecting);
        if !self.config.link.ssid.is_empty() {
            tracing::info!(ssid = %self.config.link.ssid, "link association is OS-managed");
        }

        match self.sink.lock().await.begin() {
            Ok(()) => {
                self.sink_ready.store(true, Ordering::Relaxed);
                self.status.store(AgentStatus::BrokerConnecting);
            }
            Err(e) => {
                tracing::error!(error = %e, "storage initialization failed");
                self.report_error(&format!("storage initialization failed: {}", e), ERR_STORAGE_INIT);
                self.status.store(AgentStatus::StorageError);
            }
        }
    }

    /// Flush and release resources. Workers must be stopped first.
    pub async fn end(&self) {
        let mut sink = self.sink.lock().await;
        if sink.is_initialized() {
            if let Err(e) = sink.flush() {
                tracing::warn!(error = %e, "final flush failed");
            }
            sink.end();
        }
        self.sink_ready.store(false, Ordering::Relaxed);

        let snapshot = self.stats.snapshot();
        tracing::info!(
            received = snapshot.messages_received,
            stored = snapshot.messages_stored,
            dropped = snapshot.messages_dropped,
            "pipeline stopped"
        );
    }

    /// Inbound broker callback: count, validate, buffer.
    ///
    /// Invalid messages are dropped with a counter increment. When the
    /// ring is full the oldest record is evicted to make room (bounded
    /// loss, newest traffic wins). Failure to take the buffer lock
    /// within 100 ms drops the message silently.
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) {
        self.stats.messages_received.inc();

        if let Some(callback) = &self.message_callback {
            callback(topic, payload);
        }

        if let Err(e) = self.validator.validate(topic, payload) {
            self.stats.validation_errors.inc();
            tracing::debug!(topic = %topic, error = %e, "message rejected by schema");
            return;
        }

        let mut buffer = match timeout(BUFFER_LOCK_TIMEOUT, self.buffer.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!(topic = %topic, "buffer lock contention, message dropped");
                return;
            }
        };

        if buffer.is_full() {
            buffer.remove_oldest();
            self.stats.messages_dropped.inc();
            self.status.store(AgentStatus::BufferFull);
        } else if self.status.load() == AgentStatus::BufferFull {
            self.status.store(AgentStatus::Running);
        }

        buffer.push(topic, payload);
        self.stats.set_buffer_len(buffer.len());
    }

    /// Drain one message from the ring into the sink.
    ///
    /// Returns `true` when a message was dequeued. The buffer lock is
    /// released before storage I/O begins; a dequeued message that
    /// fails to write is lost (re-enqueueing a persistently failing
    /// record would loop forever), counted in `storage_errors`.
    pub async fn drain_once(&self) -> bool {
        if !self.sink_ready.load(Ordering::Relaxed) {
            // Leave messages buffered rather than popping into a sink
            // that never initialized.
            return false;
        }

        let msg = {
            let mut buffer = match timeout(BUFFER_LOCK_TIMEOUT, self.buffer.lock()).await {
                Ok(guard) => guard,
                Err(_) => return false,
            };
            let msg = buffer.pop();
            self.stats.set_buffer_len(buffer.len());
            msg
        };

        let msg = match msg {
            Some(msg) => msg,
            None => return false,
        };

        let payload = msg.payload_str();
        let mut sink = self.sink.lock().await;
        match sink.write_message(&msg.topic, &payload, msg.timestamp_ms) {
            Ok(()) => {
                self.stats.messages_stored.inc();
                if self.status.load() == AgentStatus::StorageError {
                    self.status.store(AgentStatus::Running);
                }
            }
            Err(e) => {
                self.stats.storage_errors.inc();
                self.status.store(AgentStatus::StorageError);
                tracing::warn!(topic = %msg.topic, error = %e, "storage write failed, message lost");
                self.report_error(&format!("storage write failed: {}", e), ERR_STORAGE_WRITE);
            }
        }
        true
    }

    /// Refresh the sampled gauges. Cheap; safe to call from any task.
    pub fn update(&self) {
        if let Ok(buffer) = self.buffer.try_lock() {
            self.stats.set_buffer_len(buffer.len());
        }
        self.stats.set_free_memory(free_memory_bytes());
    }

    /// Watchdog probe: warn on low memory, low disk, high buffer usage.
    pub async fn health_check(&self) {
        let free_mem = free_memory_bytes();
        self.stats.set_free_memory(free_mem);
        if free_mem > 0 && free_mem < self.config.health.memory_warning_bytes() {
            tracing::warn!(
                free_bytes = free_mem,
                threshold_kb = self.config.health.memory_warning_kb,
                "low memory"
            );
        }

        if self.sink_ready.load(Ordering::Relaxed) {
            if let Ok(sink) = timeout(HEALTH_LOCK_TIMEOUT, self.sink.lock()).await {
                let free = sink.free_space();
                if free > 0 && free < self.config.health.storage_warning_bytes() {
                    tracing::warn!(
                        free_mb = free / (1024 * 1024),
                        threshold_mb = self.config.health.storage_warning_mb,
                        "low storage space"
                    );
                }
            }
        }

        let usage = self.stats.buffer_usage_percent();
        if self.stats.buffer_len() >= self.config.buffer.critical_mark as u64 {
            tracing::warn!(usage = %format!("{:.1}%", usage), "buffer at critical mark, oldest messages will drop");
        } else if usage > 80.0 {
            tracing::warn!(usage = %format!("{:.1}%", usage), "buffer usage high");
        }
    }

    /// Subscribe to an additional topic. Callers must wait until the
    /// workers are running.
    pub async fn subscribe(&self, topic: &str, qos: u8) -> Result<(), PipelineError> {
        let handle = self.broker.get().ok_or(PipelineError::BrokerNotAttached)?;
        handle.subscribe(topic, qos).await?;
        Ok(())
    }

    /// Unsubscribe from a topic.
    pub async fn unsubscribe(&self, topic: &str) -> Result<(), PipelineError> {
        let handle = self.broker.get().ok_or(PipelineError::BrokerNotAttached)?;
        handle.unsubscribe(topic).await?;
        Ok(())
    }

    pub(crate) fn attach_broker(&self, handle: ClientHandle) {
        // A second spawn_workers call on the same supervisor is a bug;
        // keep the first handle.
        let _ = self.broker.set(handle);
    }

    pub(crate) fn set_status(&self, status: AgentStatus) {
        self.status.store(status);
    }

    /// CONNACK received: resubscribe and report running.
    pub(crate) async fn on_broker_connected(&self) {
        self.stats.broker_reconnects.inc();
        self.status.store(AgentStatus::Running);

        if let Some(handle) = self.broker.get() {
            for sub in &self.config.broker.subscriptions {
                match handle.subscribe(&sub.topic, sub.qos).await {
                    Ok(()) => {
                        tracing::info!(topic = %sub.topic, qos = sub.qos, "subscribed");
                    }
                    Err(e) => {
                        tracing::warn!(topic = %sub.topic, error = %e, "subscribe failed");
                    }
                }
            }
        }
    }

    fn report_error(&self, message: &str, code: i32) {
        if let Some(callback) = &self.error_callback {
            callback(message, code);
        }
    }
}

#[cfg(test)]
#[path = "supervisor_test.rs"]
mod supervisor_test;
