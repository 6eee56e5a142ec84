//! Storage sink layout and rotation

use serde::Deserialize;
use std::time::Duration;

/// File sink configuration
///
/// # Example
///
/// ```toml
/// [storage]
/// base_path = "/telemetry"
/// prefix = "data"
/// extension = ".jsonl"
/// max_file_size_mb = 10
/// flush_interval = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for data files, created if absent
    /// Default: /telemetry
    pub base_path: String,

    /// Filename prefix
    /// Default: data
    pub prefix: String,

    /// Filename extension, with leading dot
    /// Default: .jsonl
    pub extension: String,

    /// Rotation threshold in MiB
    /// Default: 10
    pub max_file_size_mb: u64,

    /// Maximum exposure window before a flush
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: "/telemetry".into(),
            prefix: "data".into(),
            extension: ".jsonl".into(),
            max_file_size_mb: 10,
            flush_interval: Duration::from_secs(5),
        }
    }
}

impl StorageConfig {
    /// Rotation threshold in bytes
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}
