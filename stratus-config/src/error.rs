// Error types for configuration reading

use stratus_core::ApplicationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigReadError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse configuration file {path}: {message}")]
    Parse { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigReadError>;

impl From<ConfigReadError> for ApplicationError {
    fn from(err: ConfigReadError) -> Self {
        let code = match &err {
            ConfigReadError::Io { .. } => "FILE_NOT_FOUND",
            ConfigReadError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ConfigReadError::Parse { .. } => "READ_FAILED",
        };
        ApplicationError::configuration(None, code, err.to_string()).with_cause(&err)
    }
}
