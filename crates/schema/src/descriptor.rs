//! Schema document model
//!
//! Deserialized straight from the JSON schema file with serde; every
//! field except `fields` itself is optional with a sensible default.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{Deserializer, Visitor};
use serde::Deserialize;

use crate::SchemaError;

/// A named field schema with an optional topic gate.
#[derive(Debug, Clone, Deserialize)]
pub struct Schema {
    /// Schema identifier, informational only.
    #[serde(default)]
    pub name: String,

    /// MQTT-style topic pattern (`+` single level, trailing `#`
    /// multi-level). Empty means "no topic gate".
    #[serde(default)]
    pub topic_pattern: String,

    /// Field descriptors, checked in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Load a schema from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse a schema from an in-memory JSON string.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_str(json)?;
        if schema.fields.is_empty() {
            return Err(SchemaError::EmptyFields);
        }
        Ok(schema)
    }
}

/// One row of the schema's field table.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescriptor {
    /// Key looked up in the payload object.
    pub name: String,

    /// Expected JSON type. Unknown type strings accept any value.
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Reject the message when the key is absent (unless `auto_fill`).
    #[serde(default)]
    pub required: bool,

    /// Absence is tolerated even when required; a downstream producer
    /// supplies the default.
    #[serde(default)]
    pub auto_fill: bool,

    /// Range and pattern constraints.
    #[serde(default)]
    pub validation: FieldRules,
}

impl FieldDescriptor {
    /// Inclusive lower bound for numeric fields.
    pub fn min(&self) -> f64 {
        self.validation.min.unwrap_or(f64::NEG_INFINITY)
    }

    /// Inclusive upper bound for numeric fields.
    pub fn max(&self) -> f64 {
        self.validation.max.unwrap_or(f64::INFINITY)
    }

    /// Substring a string field must contain, if any.
    pub fn pattern(&self) -> Option<&str> {
        self.validation.pattern.as_deref().filter(|p| !p.is_empty())
    }
}

/// Optional constraints nested under a field's `validation` key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldRules {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub pattern: Option<String>,
}

/// Declared field type.
///
/// `Other` preserves unrecognized type strings; they type-check against
/// any value so newer schema documents keep working on older agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Double,
    Boolean,
    Array,
    Object,
    Other(String),
}

impl Default for FieldType {
    fn default() -> Self {
        FieldType::String
    }
}

impl FieldType {
    /// Whether this is one of the numeric types subject to range checks.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float | FieldType::Double)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Other(s) => s,
        }
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldTypeVisitor;

        impl<'de> Visitor<'de> for FieldTypeVisitor {
            type Value = FieldType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a field type string")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<FieldType, E> {
                Ok(match v {
                    "string" => FieldType::String,
                    "integer" => FieldType::Integer,
                    "float" => FieldType::Float,
                    "double" => FieldType::Double,
                    "boolean" => FieldType::Boolean,
                    "array" => FieldType::Array,
                    "object" => FieldType::Object,
                    other => FieldType::Other(other.to_owned()),
                })
            }
        }

        deserializer.deserialize_str(FieldTypeVisitor)
    }
}
