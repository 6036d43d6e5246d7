// Parameter schemas for action and command validation

use crate::{ApplicationError, Result};
use serde_json::Value;
use std::fmt;

/// Expected type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    String,
    Integer,
    Float,
    Boolean,
    Object,
    Array,
    Any,
}

impl TypeCode {
    fn matches(&self, value: &Value) -> bool {
        match self {
            TypeCode::String => value.is_string(),
            TypeCode::Integer => value.is_i64() || value.is_u64(),
            TypeCode::Float => value.is_number(),
            TypeCode::Boolean => value.is_boolean(),
            TypeCode::Object => value.is_object(),
            TypeCode::Array => value.is_array(),
            TypeCode::Any => true,
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeCode::String => "string",
            TypeCode::Integer => "integer",
            TypeCode::Float => "float",
            TypeCode::Boolean => "boolean",
            TypeCode::Object => "object",
            TypeCode::Array => "array",
            TypeCode::Any => "any",
        };
        f.write_str(name)
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Path of the offending property.
    pub path: String,
    /// Violation code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Validates inbound parameters.
pub trait Schema: Send + Sync {
    /// Collect all violations of `value`.
    fn violations(&self, value: &Value) -> Vec<ValidationResult>;

    /// Validate and convert violations into a bad request error.
    fn validate(&self, correlation_id: Option<&str>, value: &Value) -> Result<()> {
        let violations = self.violations(value);
        if violations.is_empty() {
            return Ok(());
        }

        let message = violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let details: Vec<Value> = violations
            .iter()
            .map(|v| serde_json::json!({ "path": v.path, "code": v.code, "message": v.message }))
            .collect();

        Err(
            ApplicationError::bad_request(correlation_id, "INVALID_DATA", message)
                .with_details("errors", details),
        )
    }
}

#[derive(Debug, Clone)]
struct PropertySchema {
    name: String,
    type_code: TypeCode,
    required: bool,
}

/// Schema for JSON objects with typed properties.
///
/// ```
/// use stratus_core::{ObjectSchema, Schema, TypeCode};
/// use serde_json::json;
///
/// let schema = ObjectSchema::new()
///     .with_required_property("id", TypeCode::String)
///     .with_optional_property("limit", TypeCode::Integer);
///
/// assert!(schema.validate(None, &json!({ "id": "1" })).is_ok());
/// assert!(schema.validate(None, &json!({ "limit": 5 })).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    properties: Vec<PropertySchema>,
    allow_undefined: bool,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            allow_undefined: true,
        }
    }
}

impl ObjectSchema {
    /// Create a schema that allows undeclared properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required property.
    pub fn with_required_property(mut self, name: impl Into<String>, type_code: TypeCode) -> Self {
        self.properties.push(PropertySchema {
            name: name.into(),
            type_code,
            required: true,
        });
        self
    }

    /// Add an optional property.
    pub fn with_optional_property(mut self, name: impl Into<String>, type_code: TypeCode) -> Self {
        self.properties.push(PropertySchema {
            name: name.into(),
            type_code,
            required: false,
        });
        self
    }

    /// Set whether undeclared properties are allowed.
    pub fn allow_undefined(mut self, allow: bool) -> Self {
        self.allow_undefined = allow;
        self
    }
}

impl Schema for ObjectSchema {
    fn violations(&self, value: &Value) -> Vec<ValidationResult> {
        let Some(object) = value.as_object() else {
            return vec![ValidationResult {
                path: String::new(),
                code: "IS_NOT_OBJECT".to_string(),
                message: "Value is not an object".to_string(),
            }];
        };

        let mut results = Vec::new();

        for property in &self.properties {
            match object.get(&property.name) {
                None | Some(Value::Null) => {
                    if property.required {
                        results.push(ValidationResult {
                            path: property.name.clone(),
                            code: "VALUE_IS_NULL".to_string(),
                            message: format!("{} must not be null", property.name),
                        });
                    }
                }
                Some(v) if !property.type_code.matches(v) => {
                    results.push(ValidationResult {
                        path: property.name.clone(),
                        code: "TYPE_MISMATCH".to_string(),
                        message: format!("{} must be {}", property.name, property.type_code),
                    });
                }
                Some(_) => {}
            }
        }

        if !self.allow_undefined {
            for key in object.keys() {
                if !self.properties.iter().any(|p| &p.name == key) {
                    results.push(ValidationResult {
                        path: key.clone(),
                        code: "UNEXPECTED_PROPERTY".to_string(),
                        message: format!("{} is not expected", key),
                    });
                }
            }
        }

        results
    }
}
