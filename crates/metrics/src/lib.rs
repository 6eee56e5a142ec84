//! Agent statistics
//!
//! Process-wide counters and sampled gauges for the ingest pipeline,
//! plus a periodic reporter that emits snapshots via `tracing`.
//!
//! # Design
//!
//! - **Lock-free**: counters and gauges are atomics; increments on the
//!   ingest and drain paths never block and are never skipped
//! - **Snapshot by value**: readers get a [`StatsSnapshot`] copy, so
//!   reporting never holds up the hot path
//! - **Monotonic counters**: only `reset()` (an operator command) zeroes
//!   them; gauges are overwritten on every sample

mod memory;
mod reporter;

pub use memory::free_memory_bytes;
pub use reporter::StatsReporter;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Atomic counter wrapper for convenient metric operations
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Create a new counter initialized to 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment the counter by 1
    #[inline]
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the counter by `val`
    #[inline]
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Get the current value
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Reset to 0
    #[inline]
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Counters and gauges shared by every worker in the pipeline.
///
/// Counters only increase until [`reset`](Self::reset); the gauges
/// (`buffer_len`, `free_memory_bytes`) are refreshed by the supervisor's
/// `update()` and by the watchdog.
#[derive(Debug)]
pub struct AgentStats {
    /// Messages delivered by the broker callback.
    pub messages_received: Counter,
    /// Messages durably handed to the storage sink.
    pub messages_stored: Counter,
    /// Messages evicted from a full buffer.
    pub messages_dropped: Counter,
    /// Messages rejected by the schema validator.
    pub validation_errors: Counter,
    /// Failed storage writes.
    pub storage_errors: Counter,
    /// Successful broker (re)connections.
    pub broker_reconnects: Counter,

    buffer_len: AtomicU64,
    buffer_capacity: u64,
    free_memory: AtomicU64,
    started_at: Instant,
}

impl AgentStats {
    /// Create a stats block for a buffer of the given capacity.
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            messages_received: Counter::new(),
            messages_stored: Counter::new(),
            messages_dropped: Counter::new(),
            validation_errors: Counter::new(),
            storage_errors: Counter::new(),
            broker_reconnects: Counter::new(),
            buffer_len: AtomicU64::new(0),
            buffer_capacity: buffer_capacity as u64,
            free_memory: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record the current buffer occupancy.
    #[inline]
    pub fn set_buffer_len(&self, len: usize) {
        self.buffer_len.store(len as u64, Ordering::Relaxed);
    }

    /// Record the sampled free-memory reading.
    #[inline]
    pub fn set_free_memory(&self, bytes: u64) {
        self.free_memory.store(bytes, Ordering::Relaxed);
    }

    /// Last recorded buffer occupancy.
    pub fn buffer_len(&self) -> u64 {
        self.buffer_len.load(Ordering::Relaxed)
    }

    /// Seconds since the stats block was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Buffer occupancy as a percentage of capacity.
    pub fn buffer_usage_percent(&self) -> f64 {
        if self.buffer_capacity == 0 {
            return 0.0;
        }
        (self.buffer_len.load(Ordering::Relaxed) as f64 * 100.0) / self.buffer_capacity as f64
    }

    /// Zero the monotonic counters. Gauges and uptime are untouched.
    pub fn reset(&self) {
        self.messages_received.reset();
        self.messages_stored.reset();
        self.messages_dropped.reset();
        self.validation_errors.reset();
        self.storage_errors.reset();
        self.broker_reconnects.reset();
    }

    /// Take a point-in-time snapshot of all counters and gauges.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_received: self.messages_received.get(),
            messages_stored: self.messages_stored.get(),
            messages_dropped: self.messages_dropped.get(),
            validation_errors: self.validation_errors.get(),
            storage_errors: self.storage_errors.get(),
            broker_reconnects: self.broker_reconnects.get(),
            uptime_seconds: self.uptime_seconds(),
            free_memory_bytes: self.free_memory.load(Ordering::Relaxed),
            buffer_usage_percent: self.buffer_usage_percent(),
        }
    }
}

/// Point-in-time snapshot of [`AgentStats`], returned by value.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct StatsSnapshot {
    pub messages_received: u64,
    pub messages_stored: u64,
    pub messages_dropped: u64,
    pub validation_errors: u64,
    pub storage_errors: u64,
    pub broker_reconnects: u64,
    pub uptime_seconds: u64,
    pub free_memory_bytes: u64,
    pub buffer_usage_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_operations() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);
        counter.inc();
        counter.inc();
        counter.add(3);
        assert_eq!(counter.get(), 5);
        counter.reset();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = AgentStats::new(100);
        stats.messages_received.add(10);
        stats.messages_stored.add(7);
        stats.messages_dropped.inc();
        stats.set_buffer_len(25);

        let snap = stats.snapshot();
        assert_eq!(snap.messages_received, 10);
        assert_eq!(snap.messages_stored, 7);
        assert_eq!(snap.messages_dropped, 1);
        assert_eq!(snap.buffer_usage_percent, 25.0);
    }

    #[test]
    fn test_reset_zeroes_counters_keeps_gauges() {
        let stats = AgentStats::new(10);
        stats.messages_received.add(4);
        stats.set_buffer_len(5);
        stats.set_free_memory(1024);

        stats.reset();

        let snap = stats.snapshot();
        assert_eq!(snap.messages_received, 0);
        assert_eq!(snap.buffer_usage_percent, 50.0);
        assert_eq!(snap.free_memory_bytes, 1024);
    }

    #[test]
    fn test_zero_capacity_usage_is_zero() {
        let stats = AgentStats::new(0);
        stats.set_buffer_len(0);
        assert_eq!(stats.buffer_usage_percent(), 0.0);
    }

    #[test]
    fn test_concurrent_increments() {
        use std::sync::Arc;

        let stats = Arc::new(AgentStats::new(10));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    stats.messages_received.inc();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.messages_received.get(), 4000);
    }
}
