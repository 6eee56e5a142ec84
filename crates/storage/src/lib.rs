//! Rotating JSONL storage sink
//!
//! Persists accepted messages as newline-delimited JSON records under a
//! base directory, rotating to a fresh timestamped file before any
//! write that would breach the size threshold.
//!
//! # Output Format
//!
//! One message per line, UTF-8, `\n`-terminated:
//! ```text
//! {"topic":"sensors/a/temperature","payload":{"value":21.5},"timestamp":1000}
//! ```
//!
//! The payload is inserted verbatim when it is a valid JSON value; a
//! non-JSON payload is escaped into a JSON string so every persisted
//! line stays parseable.
//!
//! # Durability
//!
//! Writes land in the OS file buffer immediately and are flushed to
//! media at most `flush_interval` later; `flush()` forces the sync.
//! Rotation flushes and closes the old file before the new one opens.

mod sink;

pub use sink::{SinkConfig, StorageError, StorageSink, StorageStats, MAX_LINE_LEN};
