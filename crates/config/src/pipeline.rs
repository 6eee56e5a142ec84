//! Worker cadence tuning

use serde::Deserialize;
use std::time::Duration;

/// Pipeline worker intervals
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sleep between drain-worker iterations
    /// Default: 100ms
    #[serde(with = "humantime_serde")]
    pub drain_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            drain_interval: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.drain_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_deserialize() {
        let config: PipelineConfig = toml::from_str("drain_interval = \"5ms\"").unwrap();
        assert_eq!(config.drain_interval, Duration::from_millis(5));
    }
}
