//! Lambda error types.

use stratus_core::ApplicationError;
use thiserror::Error;

/// Result type for Lambda runtime operations.
pub type Result<T> = std::result::Result<T, LambdaError>;

/// Lambda runtime errors.
#[derive(Debug, Error)]
pub enum LambdaError {
    /// Application error raised by the function container.
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Lambda runtime error.
    #[error("Lambda runtime error: {0}")]
    Runtime(String),
}

impl From<lambda_runtime::Error> for LambdaError {
    fn from(err: lambda_runtime::Error) -> Self {
        Self::Runtime(err.to_string())
    }
}

/// Convert an application error into a runtime error whose message is the
/// serialized error, so invokers receive the structured form.
pub(crate) fn to_runtime_error(err: &ApplicationError) -> lambda_runtime::Error {
    lambda_runtime::Error::from(err.to_json().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_carries_json() {
        let err = ApplicationError::bad_request(Some("c1"), "NO_ACTION", "Action x was not found")
            .with_details("command", "x");

        let message = to_runtime_error(&err).to_string();
        let parsed: serde_json::Value = serde_json::from_str(&message).unwrap();
        assert_eq!(parsed["code"], "NO_ACTION");
        assert_eq!(parsed["details"]["command"], "x");
    }

    #[test]
    fn test_from_application_error() {
        let err: LambdaError = ApplicationError::unknown(None, "X", "boom").into();
        assert!(matches!(err, LambdaError::Application(_)));
    }
}
