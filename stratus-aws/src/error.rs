//! AWS error types.

use stratus_core::ApplicationError;
use thiserror::Error;

/// Result type for AWS operations.
pub type Result<T> = std::result::Result<T, AwsError>;

/// Errors reported by AWS service seams.
#[derive(Debug, Error)]
pub enum AwsError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The resource being created already exists.
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Service error.
    #[error("AWS service error: {0}")]
    Service(String),

    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AwsError {
    /// Create a service error from any displayable SDK error.
    pub fn service(err: impl std::fmt::Display) -> Self {
        Self::Service(err.to_string())
    }

    /// Check for an "already exists" failure.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists(_))
    }
}

impl From<AwsError> for ApplicationError {
    fn from(err: AwsError) -> Self {
        match &err {
            AwsError::Config(_) => ApplicationError::configuration(None, "AWS_CONFIG", err.to_string()),
            _ => ApplicationError::invocation(None, "AWS_CALL_FAILED", err.to_string()),
        }
    }
}
