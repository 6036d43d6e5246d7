//! Configuration loading for Stratus containers.
//!
//! Containers read one templated configuration file at start-up. The file
//! location defaults to [`DEFAULT_CONFIG_PATH`] and can be overridden with the
//! `CONFIG_PATH` environment variable; process environment variables are the
//! template parameters.
//!
//! ```no_run
//! use stratus_config::{EnvLoader, config_path, read_config};
//!
//! let parameters = EnvLoader::default().load();
//! let config = read_config(None, &config_path(None), &parameters).unwrap();
//! println!("{}", config);
//! ```

pub mod env;
pub mod error;
pub mod reader;

pub use env::EnvLoader;
pub use error::{ConfigReadError, Result};
pub use reader::{ConfigReader, FileFormat, parameterize, read_config};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "./config/config.yml";

/// Resolve the configuration file path.
///
/// `CONFIG_PATH` wins over `default`, which wins over [`DEFAULT_CONFIG_PATH`].
pub fn config_path(default: Option<&str>) -> String {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| default.unwrap_or(DEFAULT_CONFIG_PATH).to_string())
}
