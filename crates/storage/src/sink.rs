//! File sink implementation

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use chrono::Local;
use thiserror::Error;

/// Per-line formatting budget in bytes. A record that would exceed this
/// fails without a partial append.
pub const MAX_LINE_LEN: usize = 2048;

/// Configuration for the storage sink
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Directory for data files, created if absent
    pub base_path: PathBuf,

    /// Filename prefix (e.g., "data" -> "data_20250115_103045.jsonl")
    pub prefix: String,

    /// Filename extension, with leading dot
    pub extension: String,

    /// Rotation threshold in bytes
    pub max_file_size: u64,

    /// Maximum exposure window before a flush
    pub flush_interval: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/telemetry"),
            prefix: "data".into(),
            extension: ".jsonl".into(),
            max_file_size: 10 * 1024 * 1024,
            flush_interval: Duration::from_secs(5),
        }
    }
}

impl SinkConfig {
    /// Create config with a custom base path
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = path.into();
        self
    }

    /// Create config with a custom rotation threshold
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Create config with a custom flush interval
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }
}

/// Errors from the storage sink
#[derive(Debug, Error)]
pub enum StorageError {
    /// begin() has not run, or the device was unavailable at begin()
    #[error("storage sink not initialized")]
    NotInitialized,

    /// Failed to create the base directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to create a data file
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Record formatting would exceed the per-line budget
    #[error("record for topic '{topic}' exceeds {limit} byte line limit")]
    LineTooLong { topic: String, limit: usize },

    /// I/O error on write or flush
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Cumulative sink statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageStats {
    pub bytes_written: u64,
    pub writes_completed: u64,
    pub writes_failed: u64,
    pub files_created: u64,
}

/// The open data file and its running byte count
#[derive(Debug)]
struct OpenFile {
    file: File,
    path: PathBuf,
    bytes_written: u64,
}

/// Rotating JSONL file sink
///
/// Exactly one file is open while the sink is initialized. All methods
/// take `&mut self`; the drain worker owns the sink behind the
/// supervisor's storage lock.
#[derive(Debug)]
pub struct StorageSink {
    config: SinkConfig,
    current: Option<OpenFile>,
    last_flush: Instant,
    epoch: Instant,
    stats: StorageStats,
    line_buf: BytesMut,
}

impl StorageSink {
    /// Create an uninitialized sink. No filesystem access until
    /// [`begin`](Self::begin).
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            current: None,
            last_flush: Instant::now(),
            epoch: Instant::now(),
            stats: StorageStats::default(),
            line_buf: BytesMut::with_capacity(MAX_LINE_LEN),
        }
    }

    /// Ensure the base directory exists and open the initial data file.
    pub fn begin(&mut self) -> Result<(), StorageError> {
        let base = &self.config.base_path;
        if !base.exists() {
            fs::create_dir_all(base).map_err(|e| StorageError::CreateDir {
                path: base.display().to_string(),
                source: e,
            })?;
        }

        self.open_new_file()?;
        Ok(())
    }

    /// Flush and close the current file. The sink can be re-begun.
    pub fn end(&mut self) {
        if let Some(mut open) = self.current.take() {
            let _ = open.file.flush();
            let _ = open.file.sync_all();
            tracing::debug!(path = %open.path.display(), "storage file closed");
        }
    }

    /// Whether begin() succeeded and a file is open.
    pub fn is_initialized(&self) -> bool {
        self.current.is_some()
    }

    /// Path of the file currently being written.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|open| open.path.as_path())
    }

    /// Bytes written to the current file so far.
    pub fn current_file_size(&self) -> u64 {
        self.current.as_ref().map_or(0, |open| open.bytes_written)
    }

    /// Cumulative statistics, by value.
    pub fn stats(&self) -> StorageStats {
        self.stats
    }

    /// Append one message as a JSON line.
    ///
    /// Rotates first when the current file has reached the size
    /// threshold; a rotation failure fails the write. A record that
    /// would exceed [`MAX_LINE_LEN`] fails without partial output.
    pub fn write_message(
        &mut self,
        topic: &str,
        payload: &str,
        timestamp_ms: u64,
    ) -> Result<(), StorageError> {
        if self.current.is_none() {
            return Err(StorageError::NotInitialized);
        }

        if self.current_file_size() >= self.config.max_file_size {
            if let Err(e) = self.rotate() {
                self.stats.writes_failed += 1;
                return Err(e);
            }
        }

        let line_len = match format_line(&mut self.line_buf, topic, payload, timestamp_ms) {
            Some(len) => len,
            None => {
                self.stats.writes_failed += 1;
                return Err(StorageError::LineTooLong {
                    topic: topic.to_owned(),
                    limit: MAX_LINE_LEN,
                });
            }
        };

        let open = match self.current.as_mut() {
            Some(open) => open,
            None => return Err(StorageError::NotInitialized),
        };
        if let Err(e) = open.file.write_all(&self.line_buf) {
            self.stats.writes_failed += 1;
            return Err(e.into());
        }

        open.bytes_written += line_len as u64;
        self.stats.bytes_written += line_len as u64;
        self.stats.writes_completed += 1;

        if self.last_flush.elapsed() > self.config.flush_interval {
            self.flush()?;
        }

        Ok(())
    }

    /// Append several payloads for one topic, flushing once at the end.
    ///
    /// Every payload is attempted; the first failure is returned after
    /// the rest have been tried.
    pub fn write_batch(&mut self, topic: &str, payloads: &[&str]) -> Result<(), StorageError> {
        if self.current.is_none() {
            return Err(StorageError::NotInitialized);
        }

        let mut first_err = None;
        for payload in payloads {
            let timestamp_ms = self.epoch.elapsed().as_millis() as u64;
            if let Err(e) = self.write_message(topic, payload, timestamp_ms) {
                first_err.get_or_insert(e);
            }
        }

        self.flush()?;
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Durably commit pending bytes.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        let open = self.current.as_mut().ok_or(StorageError::NotInitialized)?;
        open.file.flush()?;
        open.file.sync_data()?;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Flush and close the current file, then open a fresh one.
    pub fn rotate(&mut self) -> Result<(), StorageError> {
        if let Some(mut open) = self.current.take() {
            open.file.flush()?;
            open.file.sync_all()?;
        }
        self.open_new_file()
    }

    /// Free bytes on the volume holding `base_path`. 0 when unknown.
    pub fn free_space(&self) -> u64 {
        fs2::available_space(&self.config.base_path).unwrap_or(0)
    }

    /// Total bytes on the volume holding `base_path`. 0 when unknown.
    pub fn total_space(&self) -> u64 {
        fs2::total_space(&self.config.base_path).unwrap_or(0)
    }

    fn open_new_file(&mut self) -> Result<(), StorageError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

        // Second-resolution names collide under rapid rotation; a
        // counter suffix keeps every file distinct.
        let mut candidate = self.file_path(&stamp, 0);
        let mut counter = 0u32;
        let file = loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(file) => break file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    counter += 1;
                    candidate = self.file_path(&stamp, counter);
                }
                Err(e) => {
                    return Err(StorageError::CreateFile {
                        path: candidate.display().to_string(),
                        source: e,
                    });
                }
            }
        };

        tracing::info!(path = %candidate.display(), "created new storage file");

        self.current = Some(OpenFile {
            file,
            path: candidate,
            bytes_written: 0,
        });
        self.stats.files_created += 1;
        Ok(())
    }

    fn file_path(&self, stamp: &str, counter: u32) -> PathBuf {
        let name = if counter == 0 {
            format!("{}_{}{}", self.config.prefix, stamp, self.config.extension)
        } else {
            format!(
                "{}_{}_{}{}",
                self.config.prefix, stamp, counter, self.config.extension
            )
        };
        self.config.base_path.join(name)
    }
}

impl Drop for StorageSink {
    fn drop(&mut self) {
        self.end();
    }
}

/// Format one record into `buf`. Returns the line length, or `None`
/// when it would exceed [`MAX_LINE_LEN`] (buf is left empty).
fn format_line(buf: &mut BytesMut, topic: &str, payload: &str, timestamp_ms: u64) -> Option<usize> {
    buf.clear();
    buf.extend_from_slice(b"{\"topic\":");
    // serde_json escapes quotes and control bytes in the topic
    let topic_json = serde_json::to_string(topic).ok()?;
    buf.extend_from_slice(topic_json.as_bytes());
    buf.extend_from_slice(b",\"payload\":");

    if is_json_value(payload) {
        buf.extend_from_slice(payload.as_bytes());
    } else {
        let escaped = serde_json::to_string(payload).ok()?;
        buf.extend_from_slice(escaped.as_bytes());
    }

    buf.extend_from_slice(b",\"timestamp\":");
    buf.extend_from_slice(timestamp_ms.to_string().as_bytes());
    buf.extend_from_slice(b"}\n");

    if buf.len() > MAX_LINE_LEN {
        buf.clear();
        return None;
    }
    Some(buf.len())
}

/// Whether `payload` is a single well-formed JSON value.
fn is_json_value(payload: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(payload).is_ok()
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod sink_test;
