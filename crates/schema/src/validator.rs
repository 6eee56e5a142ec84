//! Payload validation against the loaded schema

use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{FieldDescriptor, FieldType, Schema};
use crate::topic::topic_matches;
use crate::SchemaError;

/// Why a message was rejected.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Topic did not match the schema pattern, or the payload is not
    /// parseable JSON.
    #[error("{reason}")]
    ParseFailed { reason: String },

    /// A required, non-auto-fill field is absent.
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// A present field has the wrong JSON type.
    #[error("type mismatch for field: {field}")]
    TypeMismatch { field: String },

    /// A numeric field is outside its inclusive bounds.
    #[error("value out of range for field: {field} ({value} not in [{min}, {max}])")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A string field does not contain its required substring.
    #[error("pattern mismatch for field: {field}")]
    PatternMismatch { field: String },
}

/// Schema-driven admission gate for inbound messages.
///
/// Holds at most one schema. The schema is replaced atomically on a
/// successful load; a failed load leaves the previous schema in place.
/// Validation is read-only, so a shared reference is enough once the
/// supervisor has finished initialization.
#[derive(Debug, Default)]
pub struct SchemaValidator {
    schema: Option<Schema>,
    enabled: bool,
}

impl SchemaValidator {
    /// Create an enabled validator with no schema loaded.
    pub fn new() -> Self {
        Self {
            schema: None,
            enabled: true,
        }
    }

    /// Load and activate a schema from a JSON file.
    pub fn load_from_file(&mut self, path: &str) -> Result<(), SchemaError> {
        let schema = Schema::from_file(path)?;
        self.schema = Some(schema);
        Ok(())
    }

    /// Load and activate a schema from an in-memory JSON string.
    pub fn load_from_json(&mut self, json: &str) -> Result<(), SchemaError> {
        let schema = Schema::from_json(json)?;
        self.schema = Some(schema);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.schema.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The active schema, if one is loaded.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Decide whether `(topic, payload)` is admissible.
    ///
    /// A disabled validator, or one with no schema loaded, admits
    /// everything.
    pub fn validate(&self, topic: &str, payload: &[u8]) -> Result<(), ValidationError> {
        let schema = match &self.schema {
            Some(schema) if self.enabled => schema,
            _ => return Ok(()),
        };

        if !schema.topic_pattern.is_empty() && !topic_matches(topic, &schema.topic_pattern) {
            return Err(ValidationError::ParseFailed {
                reason: format!("topic does not match pattern '{}'", schema.topic_pattern),
            });
        }

        let doc: Value =
            serde_json::from_slice(payload).map_err(|e| ValidationError::ParseFailed {
                reason: format!("JSON parse error: {}", e),
            })?;

        for field in &schema.fields {
            let value = match doc.get(field.name.as_str()) {
                Some(value) => value,
                None => {
                    if field.required && !field.auto_fill {
                        return Err(ValidationError::MissingField {
                            field: field.name.clone(),
                        });
                    }
                    continue;
                }
            };

            validate_field(field, value)?;
        }

        Ok(())
    }
}

fn validate_field(field: &FieldDescriptor, value: &Value) -> Result<(), ValidationError> {
    if !type_matches(&field.field_type, value) {
        return Err(ValidationError::TypeMismatch {
            field: field.name.clone(),
        });
    }

    if field.field_type.is_numeric() {
        // as_f64 is Some for every JSON number once the type check passed
        if let Some(num) = value.as_f64() {
            if num < field.min() || num > field.max() {
                return Err(ValidationError::OutOfRange {
                    field: field.name.clone(),
                    value: num,
                    min: field.min(),
                    max: field.max(),
                });
            }
        }
    }

    if field.field_type == FieldType::String {
        if let Some(pattern) = field.pattern() {
            let text = value.as_str().unwrap_or_default();
            if !text.contains(pattern) {
                return Err(ValidationError::PatternMismatch {
                    field: field.name.clone(),
                });
            }
        }
    }

    Ok(())
}

fn type_matches(field_type: &FieldType, value: &Value) -> bool {
    match field_type {
        FieldType::String => value.is_string(),
        FieldType::Integer => value.is_i64() || value.is_u64(),
        FieldType::Float | FieldType::Double => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Array => value.is_array(),
        FieldType::Object => value.is_object(),
        // Unknown type strings accept any value.
        FieldType::Other(_) => true,
    }
}

#[cfg(test)]
#[path = "validator_test.rs"]
mod validator_test;
