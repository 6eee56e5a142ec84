//! Roost Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! A minimal config should just work - only specify what you need to
//! change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use roost_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[broker]\nhost = \"broker.local\"").unwrap();
//! assert_eq!(config.broker.host, "broker.local");
//! ```
//!
//! # Example Minimal Config
//!
//! ```toml
//! [broker]
//! host = "broker.local"
//!
//! [[broker.subscriptions]]
//! topic = "sensors/#"
//!
//! [storage]
//! base_path = "/telemetry"
//! ```

mod broker;
mod buffer;
mod error;
mod health;
mod link;
mod logging;
mod metrics;
mod pipeline;
mod schema;
mod storage;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use broker::{BrokerConfig, Subscription};
pub use buffer::BufferConfig;
pub use error::{ConfigError, Result};
pub use health::HealthConfig;
pub use link::LinkConfig;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::{MetricsConfig, MetricsFormat};
pub use pipeline::PipelineConfig;
pub use schema::SchemaConfig;
pub use storage::StorageConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network link association (managed by the OS on this target)
    pub link: LinkConfig,

    /// MQTT broker endpoint and subscriptions
    pub broker: BrokerConfig,

    /// In-memory message buffer sizing
    pub buffer: BufferConfig,

    /// Storage sink layout and rotation
    pub storage: StorageConfig,

    /// Schema validation
    pub schema: SchemaConfig,

    /// Watchdog thresholds
    pub health: HealthConfig,

    /// Worker cadence tuning
    pub pipeline: PipelineConfig,

    /// Logging configuration
    pub log: LogConfig,

    /// Stats reporting configuration
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks cross-field consistency: watermark ordering, QoS bounds,
    /// rotation sizing, endpoint sanity.
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert!(config.buffer.capacity > 0);
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.storage.extension, ".jsonl");
        assert!(config.broker.subscriptions.is_empty());
    }

    #[test]
    fn test_minimal_config() {
        let toml = r#"
[broker]
host = "broker.local"

[[broker.subscriptions]]
topic = "sensors/#"
qos = 1
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.broker.host, "broker.local");
        assert_eq!(config.broker.subscriptions.len(), 1);
        assert_eq!(config.broker.subscriptions[0].topic, "sensors/#");
        assert_eq!(config.broker.subscriptions[0].qos, 1);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[link]
ssid = "plant-floor"
timeout = "20s"

[broker]
host = "broker.example.com"
port = 8883
username = "edge"
password = "secret"
client_id = "roost-7"
reconnect_delay = "5s"

[[broker.subscriptions]]
topic = "sensors/+/temperature"
qos = 1

[buffer]
capacity = 500
high_watermark = 400
critical_mark = 475

[storage]
base_path = "/var/lib/roost"
prefix = "telemetry"
extension = ".jsonl"
max_file_size_mb = 25
flush_interval = "2s"

[schema]
path = "/etc/roost/sensor-v1.json"
validation_enabled = true

[health]
memory_warning_kb = 65536
storage_warning_mb = 200
check_interval = "1m"

[pipeline]
drain_interval = "50ms"

[log]
level = "debug"

[metrics]
enabled = true
interval = "30s"
format = "json"
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.link.ssid, "plant-floor");
        assert_eq!(config.broker.port, 8883);
        assert_eq!(config.broker.username, "edge");
        assert_eq!(config.buffer.capacity, 500);
        assert_eq!(config.storage.max_file_size_mb, 25);
        assert_eq!(config.storage.max_file_size(), 25 * 1024 * 1024);
        assert_eq!(config.schema.path.as_deref(), Some("/etc/roost/sensor-v1.json"));
        assert_eq!(config.health.storage_warning_mb, 200);
        assert_eq!(config.pipeline.drain_interval.as_millis(), 50);
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.metrics.format, MetricsFormat::Json);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(result.is_err());
    }
}
