// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{Config, RawConfig};
use crate::errors::{Dib2CloudError, Result};

impl TryFrom<RawConfig> for Config {
    type Error = crate::errors::Dib2CloudError;

    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(Config::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfig) -> Result<()> {
    validate_tools(cfg)?;
    validate_diskimages(cfg)?;
    validate_providers(cfg)?;
    Ok(())
}

fn validate_tools(cfg: &RawConfig) -> Result<()> {
    if cfg.build_tool.trim().is_empty() {
        return Err(Dib2CloudError::ConfigError(
            "build_tool must not be empty".to_string(),
        ));
    }
    if cfg.upload_tool.trim().is_empty() {
        return Err(Dib2CloudError::ConfigError(
            "upload_tool must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_diskimages(cfg: &RawConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for image in cfg.diskimages.iter() {
        if image.name.trim().is_empty() {
            return Err(Dib2CloudError::ConfigError(
                "diskimage with empty name".to_string(),
            ));
        }
        if !seen.insert(image.name.as_str()) {
            return Err(Dib2CloudError::ConfigError(format!(
                "multiple diskimages with name '{}'",
                image.name
            )));
        }
        if image.elements.is_empty() {
            return Err(Dib2CloudError::ConfigError(format!(
                "diskimage '{}' must list at least one element",
                image.name
            )));
        }
        if image.formats.is_empty() {
            return Err(Dib2CloudError::ConfigError(format!(
                "diskimage '{}' must list at least one format",
                image.name
            )));
        }
    }
    Ok(())
}

fn validate_providers(cfg: &RawConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for provider in cfg.providers.iter() {
        if provider.name.trim().is_empty() {
            return Err(Dib2CloudError::ConfigError(
                "provider with empty name".to_string(),
            ));
        }
        if !seen.insert(provider.name.as_str()) {
            return Err(Dib2CloudError::ConfigError(format!(
                "multiple providers with name '{}'",
                provider.name
            )));
        }
    }
    Ok(())
}
