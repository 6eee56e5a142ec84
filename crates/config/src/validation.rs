//! Cross-section configuration validation
//!
//! Catches mistakes that serde's shape checking cannot: watermark
//! ordering, QoS bounds, rotation sizing, endpoint sanity.

use crate::{Config, ConfigError, Result};

/// Validate a parsed configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_broker(config)?;
    validate_buffer(config)?;
    validate_storage(config)?;
    Ok(())
}

fn validate_broker(config: &Config) -> Result<()> {
    let broker = &config.broker;

    if broker.host.is_empty() {
        return Err(ConfigError::missing_field("broker", "host"));
    }

    if broker.port == 0 {
        return Err(ConfigError::invalid_value(
            "broker",
            "port",
            "must be non-zero",
        ));
    }

    if broker.client_id.is_empty() {
        return Err(ConfigError::missing_field("broker", "client_id"));
    }

    for sub in &broker.subscriptions {
        if sub.topic.is_empty() {
            return Err(ConfigError::missing_field("broker.subscriptions", "topic"));
        }
        if sub.qos > 2 {
            return Err(ConfigError::invalid_value(
                "broker.subscriptions",
                "qos",
                format!("{} is not a valid QoS level (0-2)", sub.qos),
            ));
        }
    }

    Ok(())
}

fn validate_buffer(config: &Config) -> Result<()> {
    let buffer = &config.buffer;

    if buffer.capacity == 0 {
        return Err(ConfigError::invalid_value(
            "buffer",
            "capacity",
            "must be non-zero",
        ));
    }

    if buffer.high_watermark > buffer.capacity {
        return Err(ConfigError::invalid_value(
            "buffer",
            "high_watermark",
            format!(
                "{} exceeds capacity {}",
                buffer.high_watermark, buffer.capacity
            ),
        ));
    }

    if buffer.critical_mark > buffer.capacity {
        return Err(ConfigError::invalid_value(
            "buffer",
            "critical_mark",
            format!(
                "{} exceeds capacity {}",
                buffer.critical_mark, buffer.capacity
            ),
        ));
    }

    if buffer.high_watermark > buffer.critical_mark {
        return Err(ConfigError::invalid_value(
            "buffer",
            "high_watermark",
            format!(
                "{} exceeds critical_mark {}",
                buffer.high_watermark, buffer.critical_mark
            ),
        ));
    }

    Ok(())
}

fn validate_storage(config: &Config) -> Result<()> {
    let storage = &config.storage;

    if storage.base_path.is_empty() {
        return Err(ConfigError::missing_field("storage", "base_path"));
    }

    if storage.prefix.is_empty() {
        return Err(ConfigError::missing_field("storage", "prefix"));
    }

    if !storage.extension.starts_with('.') {
        return Err(ConfigError::invalid_value(
            "storage",
            "extension",
            format!("'{}' must start with a dot", storage.extension),
        ));
    }

    if storage.max_file_size_mb == 0 {
        return Err(ConfigError::invalid_value(
            "storage",
            "max_file_size_mb",
            "must be non-zero",
        ));
    }

    if storage.flush_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "storage",
            "flush_interval",
            "must be non-zero",
        ));
    }

    Ok(())
}
