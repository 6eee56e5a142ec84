//! Schema validation configuration

use serde::Deserialize;

/// Where to find the schema document and whether to enforce it
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Path to the schema JSON file. None = run without a schema.
    pub path: Option<String>,

    /// Gate buffer admission on validation
    /// Default: true
    pub validation_enabled: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: None,
            validation_enabled: true,
        }
    }
}
