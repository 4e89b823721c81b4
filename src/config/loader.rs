// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{Config, RawConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfig`.
///
/// A path that does not exist yields `RawConfig::default()`. This only
/// performs TOML deserialization; use [`load_and_validate`] for the checked
/// form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfig> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = ?path, "config file not found; using defaults");
        return Ok(RawConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: RawConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let raw_config = load_from_path(&path)?;
    let config = Config::try_from(raw_config)?;
    Ok(config)
}
