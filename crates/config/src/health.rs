//! Watchdog thresholds

use serde::Deserialize;
use std::time::Duration;

/// Health-check cadence and warning thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Warn when available memory drops below this many KiB
    /// Default: 51200 (50 MiB)
    pub memory_warning_kb: u64,

    /// Warn when free storage drops below this many MiB
    /// Default: 100
    pub storage_warning_mb: u64,

    /// Interval between health checks
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            memory_warning_kb: 51_200,
            storage_warning_mb: 100,
            check_interval: Duration::from_secs(30),
        }
    }
}

impl HealthConfig {
    /// Memory warning threshold in bytes
    pub fn memory_warning_bytes(&self) -> u64 {
        self.memory_warning_kb * 1024
    }

    /// Storage warning threshold in bytes
    pub fn storage_warning_bytes(&self) -> u64 {
        self.storage_warning_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HealthConfig::default();
        assert_eq!(config.memory_warning_bytes(), 51_200 * 1024);
        assert_eq!(config.storage_warning_bytes(), 100 * 1024 * 1024);
        assert_eq!(config.check_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: HealthConfig = toml::from_str("check_interval = \"5s\"").unwrap();
        assert_eq!(config.check_interval, Duration::from_secs(5));
        assert_eq!(config.storage_warning_mb, 100);
    }
}
