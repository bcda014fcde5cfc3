//! Application service: configuration use-cases.

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{RescueConfig, apply_config_value};

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the stored configuration cannot be read or parsed.
pub fn load_config(store: &impl ConfigStore) -> Result<RescueConfig> {
    store.load()
}

/// Validate and persist one `key = value` setting.
///
/// # Errors
///
/// Returns an error if the key is unknown, the value is invalid, or the
/// configuration cannot be saved. Nothing is written on validation failure.
pub fn set_config_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<RescueConfig> {
    let mut config = store.load()?;
    apply_config_value(&mut config, key, value)?;
    store
        .save(&config)
        .with_context(|| format!("saving setting {key}"))?;
    Ok(config)
}
