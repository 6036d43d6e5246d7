// Environment variable loading

use stratus_core::ConfigParams;
use std::env;

/// Exposes process environment variables as configuration parameters.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all (or all prefixed) environment variables.
    ///
    /// Names keep their case so `{{AWS_REGION}}` templates resolve directly.
    pub fn load(&self) -> ConfigParams {
        let mut params = ConfigParams::new();

        for (key, value) in env::vars() {
            match &self.prefix {
                Some(prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str()) {
                        params.put(rest.trim_start_matches('_'), value);
                    }
                }
                None => params.put(key, value),
            }
        }

        params
    }

    /// Load a single variable.
    pub fn load_var(&self, key: &str) -> Option<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key),
            None => key.to_string(),
        };
        env::var(full_key).ok()
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_var() {
        let loader = EnvLoader::default();
        assert_eq!(loader.load_var("STRATUS_NONEXISTENT_VAR_12345"), None);
    }

    #[test]
    fn test_path_is_loaded() {
        // PATH is almost always set
        if std::env::var("PATH").is_ok() {
            assert!(EnvLoader::default().load().contains_key("PATH"));
        }
    }
}
