//! Network link association
//!
//! On this target the OS owns WiFi/Ethernet association; these options
//! are accepted so fleet configs keep one surface, and the timeout
//! bounds how long startup reports `LinkConnecting`.

use serde::Deserialize;
use std::time::Duration;

/// Link association parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Network SSID (informational on OS-managed links)
    pub ssid: String,

    /// Network passphrase
    pub password: String,

    /// How long to wait for the link before proceeding degraded
    /// Default: 20s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(20),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LinkConfig::default();
        assert!(config.ssid.is_empty());
        assert_eq!(config.timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_deserialize() {
        let toml = r#"
ssid = "factory-iot"
password = "hunter2"
timeout = "10s"
"#;
        let config: LinkConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.ssid, "factory-iot");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
