// Configuration file reader

use crate::{ConfigReadError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::fs;
use std::path::Path;
use stratus_core::ConfigParams;
use tracing::debug;

static TEMPLATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").unwrap());

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Yaml,
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "yml" | "yaml" => Some(FileFormat::Yaml),
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }

    /// Detect the format from a file path.
    pub fn from_path(path: &str) -> Result<Self> {
        let ext = Path::new(path)
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigReadError::UnsupportedFormat(path.to_string()))?;

        Self::from_extension(ext).ok_or_else(|| ConfigReadError::UnsupportedFormat(ext.to_string()))
    }
}

/// Reads templated configuration files into flat [`ConfigParams`].
///
/// `{{NAME}}` placeholders are replaced with the matching parameter value
/// (usually an environment variable) before parsing. Unknown placeholders
/// become empty strings.
pub struct ConfigReader {
    path: String,
    format: FileFormat,
}

impl ConfigReader {
    /// Create a reader, detecting the format from the extension.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let format = FileFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    /// Create a reader with an explicit format.
    pub fn with_format(path: impl Into<String>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Read, substitute and parse the file.
    pub fn read_config(
        &self,
        correlation_id: Option<&str>,
        parameters: &ConfigParams,
    ) -> Result<ConfigParams> {
        debug!(
            correlation_id = correlation_id.unwrap_or("---"),
            path = %self.path,
            "Reading configuration"
        );

        let content = fs::read_to_string(&self.path).map_err(|source| ConfigReadError::Io {
            path: self.path.clone(),
            source,
        })?;

        self.parse(&content, parameters)
    }

    /// Substitute and parse configuration text.
    pub fn parse(&self, content: &str, parameters: &ConfigParams) -> Result<ConfigParams> {
        let content = parameterize(content, parameters);

        let value: Value = match self.format {
            FileFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| self.parse_error(e))?,
            FileFormat::Json => serde_json::from_str(&content).map_err(|e| self.parse_error(e))?,
            FileFormat::Toml => toml::from_str(&content).map_err(|e| self.parse_error(e))?,
        };

        Ok(ConfigParams::from_value(&value))
    }

    fn parse_error(&self, err: impl std::fmt::Display) -> ConfigReadError {
        ConfigReadError::Parse {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }
}

/// Replace `{{NAME}}` placeholders with parameter values.
pub fn parameterize(content: &str, parameters: &ConfigParams) -> String {
    TEMPLATE_REGEX
        .replace_all(content, |caps: &Captures| {
            parameters.get(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

/// Read a configuration file with the given parameters.
pub fn read_config(
    correlation_id: Option<&str>,
    path: &str,
    parameters: &ConfigParams,
) -> Result<ConfigParams> {
    ConfigReader::new(path)?.read_config(correlation_id, parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_with_templates() {
        let reader = ConfigReader::with_format("inline.yml", FileFormat::Yaml);
        let params = ConfigParams::from_tuples(&[("AWS_REGION", "eu-west-1")]);

        let config = reader
            .parse(
                "logger:\n  connection:\n    region: {{AWS_REGION}}\n  group: {{ MISSING }}app\n",
                &params,
            )
            .unwrap();

        assert_eq!(config.get("logger.connection.region"), Some("eu-west-1"));
        assert_eq!(config.get("logger.group"), Some("app"));
    }

    #[test]
    fn test_parse_toml() {
        let reader = ConfigReader::with_format("inline.toml", FileFormat::Toml);
        let config = reader
            .parse("[options]\nconnect_timeout = 5000\n", &ConfigParams::new())
            .unwrap();

        assert_eq!(config.get("options.connect_timeout"), Some("5000"));
    }

    #[test]
    fn test_parse_error() {
        let reader = ConfigReader::with_format("bad.json", FileFormat::Json);
        let err = reader.parse("{ not json", &ConfigParams::new()).unwrap_err();

        assert!(matches!(err, ConfigReadError::Parse { .. }));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_path("config/config.yml").unwrap(), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path("a.JSON").unwrap(), FileFormat::Json);
        assert!(FileFormat::from_path("config").is_err());
        assert!(FileFormat::from_path("config.ini").is_err());
    }
}
