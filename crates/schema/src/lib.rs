//! Schema registry and message validation
//!
//! Loads a declarative field schema (JSON) and gates buffer admission:
//! a message is admitted only when its topic matches the schema's
//! MQTT-style pattern and its payload passes the per-field type, range,
//! and pattern checks.
//!
//! # Schema document
//!
//! ```json
//! {
//!   "name": "sensor-v1",
//!   "topic_pattern": "sensors/+/temperature",
//!   "fields": [
//!     { "name": "value", "type": "float", "required": true,
//!       "validation": { "min": 0, "max": 100 } }
//!   ]
//! }
//! ```
//!
//! Exactly one schema is active at a time. The field table is immutable
//! after load; validation only reads.

mod descriptor;
mod topic;
mod validator;

pub use descriptor::{FieldDescriptor, FieldRules, FieldType, Schema};
pub use topic::topic_matches;
pub use validator::{SchemaValidator, ValidationError};

use std::io;
use thiserror::Error;

/// Errors from loading or parsing a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Failed to read the schema file
    #[error("failed to read schema file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Document is not valid JSON or does not match the schema shape
    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),

    /// Document parsed but declares no fields
    #[error("schema has no fields")]
    EmptyFields,
}
