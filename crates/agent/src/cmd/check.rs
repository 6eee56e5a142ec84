//! The `check` command: validate configuration and schema offline.

use std::path::Path;

use anyhow::{bail, Result};
use roost_config::Config;
use roost_schema::Schema;

/// Load and validate the configuration, and the schema if one is
/// configured. Exits non-zero on the first problem.
pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::from_file(config_path)?;

    println!("config: {}", config_path.display());
    println!("  broker: {}:{}", config.broker.host, config.broker.port);
    for sub in &config.broker.subscriptions {
        println!("  subscription: {} (qos {})", sub.topic, sub.qos);
    }
    println!(
        "  storage: {} (rotate at {} MiB)",
        config.storage.base_path, config.storage.max_file_size_mb
    );
    println!("  buffer: {} messages", config.buffer.capacity);

    match &config.schema.path {
        Some(path) => match Schema::from_file(path) {
            Ok(schema) => {
                println!(
                    "  schema: '{}' ({} fields, pattern '{}')",
                    schema.name,
                    schema.fields.len(),
                    schema.topic_pattern
                );
            }
            Err(e) => bail!("schema '{}' failed to load: {}", path, e),
        },
        None => println!("  schema: none (validation inactive)"),
    }

    println!("configuration OK");
    Ok(())
}
