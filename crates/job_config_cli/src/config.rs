//! Locating and loading the cluster configuration for the CLI.

use std::path::{Path, PathBuf};

use job_config::Config;
use tracing::debug;

use crate::errors::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "config.toml";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Returns the configuration path to use.
///
/// An explicit path wins; otherwise `config.toml` in the current directory.
pub fn get_config_path(config_path: Option<&str>) -> PathBuf {
    if let Some(path) = config_path {
        PathBuf::from(path)
    } else {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        current_dir.join(DEFAULT_CONFIG_FILENAME)
    }
}

/// Loads and finalizes the cluster configuration at `path`.
pub fn load_config(path: &Path) -> Result<Config, Error> {
    debug!("Loading cluster configuration from {:?}", path);
    Ok(Config::load(path)?)
}
