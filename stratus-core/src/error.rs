//! Structured application errors.
//!
//! Every error that crosses a component or invocation boundary is an
//! [`ApplicationError`]: a category, a machine-readable code, a message and
//! optional correlation id, details and cause. It serializes into the
//! `error` part of an invocation response.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type for component operations.
pub type Result<T> = std::result::Result<T, ApplicationError>;

/// Broad error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or invalid configuration (connection, credentials, references).
    Configuration,
    /// Malformed request from the caller.
    BadRequest,
    /// Remote call failed or returned an unreadable response.
    Invocation,
    /// Component used in the wrong lifecycle state.
    InvalidState,
    /// Programming misuse or an unclassified failure.
    Unknown,
}

impl ErrorCategory {
    /// HTTP-like status code associated with the category.
    pub fn status(&self) -> u16 {
        match self {
            ErrorCategory::BadRequest => 400,
            _ => 500,
        }
    }

    /// Get category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "Configuration",
            ErrorCategory::BadRequest => "BadRequest",
            ErrorCategory::Invocation => "Invocation",
            ErrorCategory::InvalidState => "InvalidState",
            ErrorCategory::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured, serializable error.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[error("{category} error {code}: {message}")]
pub struct ApplicationError {
    /// Error category.
    pub category: ErrorCategory,
    /// Machine-readable error code, e.g. `NO_COMMAND`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Correlation id of the failed call chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Structured details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
    /// Description of the underlying cause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// HTTP-like status code.
    pub status: u16,
}

impl ApplicationError {
    /// Create a new error of the given category.
    pub fn new(
        category: ErrorCategory,
        correlation_id: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            correlation_id: correlation_id.map(String::from),
            details: BTreeMap::new(),
            cause: None,
            status: category.status(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(
        correlation_id: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Configuration, correlation_id, code, message)
    }

    /// Create a bad request error.
    pub fn bad_request(
        correlation_id: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::BadRequest, correlation_id, code, message)
    }

    /// Create an invocation error.
    pub fn invocation(
        correlation_id: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Invocation, correlation_id, code, message)
    }

    /// Create an invalid state error.
    pub fn invalid_state(
        correlation_id: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::InvalidState, correlation_id, code, message)
    }

    /// Create an unknown error.
    pub fn unknown(
        correlation_id: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Unknown, correlation_id, code, message)
    }

    /// Attach a structured detail.
    pub fn with_details(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Attach the underlying cause.
    pub fn with_cause(mut self, cause: impl std::fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    /// Set the correlation id if none is set yet.
    pub fn with_correlation_id(mut self, correlation_id: Option<&str>) -> Self {
        if self.correlation_id.is_none() {
            self.correlation_id = correlation_id.map(String::from);
        }
        self
    }

    /// Get a detail value.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
