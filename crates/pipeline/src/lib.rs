//! Ingest pipeline supervision
//!
//! The [`Supervisor`] owns the moving parts of the agent - ring buffer,
//! schema validator, storage sink, statistics, status - and three
//! workers cooperate around it:
//!
//! ```text
//! broker ──> broker worker ──> validate ──> ring buffer
//!                                               │
//!                               drain worker ───┴──> storage sink ──> file
//!                               watchdog: health checks
//! ```
//!
//! # Concurrency
//!
//! Two locks serialize the shared state: the buffer mutex (ingest vs
//! drain) and the storage mutex (drain vs shutdown). No code path holds
//! both at once - the drain worker always releases the buffer before
//! touching the sink, which keeps storage I/O stalls from backing up
//! into the ingest path beyond the ring's bounded capacity. Statistics
//! are lock-free atomics.

mod status;
mod supervisor;
mod workers;

pub use status::AgentStatus;
pub use supervisor::{ErrorCallback, MessageCallback, PipelineError, Supervisor};
pub use workers::{spawn_workers, WorkerHandles};
