//! MQTT broker endpoint configuration

use serde::Deserialize;
use std::time::Duration;

/// Broker endpoint, credentials, and failure-handling knobs
///
/// # Example
///
/// ```toml
/// [broker]
/// host = "broker.example.com"
/// port = 1883
/// client_id = "roost-edge-7"
///
/// [[broker.subscriptions]]
/// topic = "sensors/+/temperature"
/// qos = 1
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker hostname or IP
    /// Default: localhost
    pub host: String,

    /// Broker port
    /// Default: 1883
    pub port: u16,

    /// Username for authenticated brokers (empty = anonymous)
    pub username: String,

    /// Password for authenticated brokers
    pub password: String,

    /// MQTT client identifier
    /// Default: "roost-agent"
    pub client_id: String,

    /// Keepalive interval negotiated with the broker
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub keepalive: Duration,

    /// Minimum delay between reconnect attempts
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub reconnect_delay: Duration,

    /// Retry attempts for transient operations
    /// Default: 3
    pub max_retries: u32,

    /// Backoff between retries
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,

    /// Topics subscribed on every (re)connect
    pub subscriptions: Vec<Subscription>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            client_id: "roost-agent".into(),
            keepalive: Duration::from_secs(60),
            reconnect_delay: Duration::from_secs(5),
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            subscriptions: Vec::new(),
        }
    }
}

impl BrokerConfig {
    /// Whether credentials should be sent on connect
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

/// One topic subscription with its QoS level
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    /// Topic filter (wildcards allowed)
    pub topic: String,

    /// Quality of service, 0-2
    /// Default: 0
    #[serde(default)]
    pub qos: u8,
}
