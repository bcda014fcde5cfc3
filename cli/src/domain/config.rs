//! Domain types and validators for gce-rescue configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "rescue.image",
    "rescue.disk_type",
    "rescue.mount_point",
    "rescue.startup_script",
    "poll.initial_interval_secs",
    "poll.max_interval_secs",
    "poll.timeout_secs",
    "api.max_retries",
];

/// Guest images a rescue disk can be built from. The first one is the default.
pub const DEFAULT_SOURCE_GUESTS: &[&str] = &[
    "projects/debian-cloud/global/images/family/debian-10",
    "projects/rocky-linux-cloud/global/images/rocky-linux-8",
    "projects/ubuntu-os-cloud/global/images/ubuntu-2004-lts",
];

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.gce-rescue/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RescueConfig {
    /// Rescue disk settings.
    pub rescue: RescueDiskConfig,
    /// Long-running operation polling.
    pub poll: PollConfig,
    /// Compute Engine API access.
    pub api: ApiConfig,
}

/// Rescue disk settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RescueDiskConfig {
    /// Candidate guest images.
    pub source_guests: Vec<String>,
    /// Image the rescue disk is created from. Defaults to the first candidate.
    pub image: Option<String>,
    /// Disk type identifier for rescue disks, e.g. `pd-balanced`.
    pub disk_type: String,
    /// Where the startup script mounts the original boot disk.
    pub mount_point: String,
    /// Optional startup-script template file; the embedded one is used otherwise.
    pub startup_script: Option<PathBuf>,
}

impl Default for RescueDiskConfig {
    fn default() -> Self {
        Self {
            source_guests: DEFAULT_SOURCE_GUESTS
                .iter()
                .map(ToString::to_string)
                .collect(),
            image: None,
            disk_type: "pd-balanced".to_string(),
            mount_point: "/mnt/sysroot".to_string(),
            startup_script: None,
        }
    }
}

impl RescueDiskConfig {
    /// The image rescue disks are built from.
    ///
    /// Guest OS detection is not attempted; the configured image or the
    /// first candidate is always used.
    #[must_use]
    pub fn selected_image(&self) -> &str {
        self.image
            .as_deref()
            .or_else(|| self.source_guests.first().map(String::as_str))
            .unwrap_or(DEFAULT_SOURCE_GUESTS[0])
    }
}

/// Backoff and deadline for operation polling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    pub initial_interval_secs: u64,
    pub max_interval_secs: u64,
    pub multiplier: f64,
    /// Cumulative wait per operation; `0` disables the deadline.
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval_secs: 1,
            max_interval_secs: 10,
            multiplier: 2.0,
            timeout_secs: 1800,
        }
    }
}

impl PollConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Compute Engine API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub request_timeout_secs: u64,
    /// Retries for transient failures of a single provider call.
    pub max_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://compute.googleapis.com/compute/v1".to_string(),
            request_timeout_secs: 30,
            max_retries: 3,
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key against `config`.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(config: &RescueConfig, key: &str, value: &str) -> Result<()> {
    let invalid = |valid: String| -> anyhow::Error {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            valid,
        }
        .into()
    };
    match key {
        "rescue.image" if !config.rescue.source_guests.iter().any(|g| g == value) => {
            Err(invalid(config.rescue.source_guests.join(", ")))
        }
        "rescue.disk_type" | "rescue.mount_point" | "rescue.startup_script"
            if value.trim().is_empty() =>
        {
            Err(invalid("a non-empty string".to_string()))
        }
        "rescue.mount_point" if !value.starts_with('/') => {
            Err(invalid("an absolute path".to_string()))
        }
        "poll.initial_interval_secs" | "poll.max_interval_secs" => match value.parse::<u64>() {
            Ok(n) if n > 0 => Ok(()),
            _ => Err(invalid("a positive integer".to_string())),
        },
        "poll.timeout_secs" => value
            .parse::<u64>()
            .map(|_| ())
            .map_err(|_| invalid("a non-negative integer (0 disables the deadline)".to_string())),
        "api.max_retries" => value
            .parse::<u32>()
            .map(|_| ())
            .map_err(|_| invalid("a non-negative integer".to_string())),
        _ => Ok(()),
    }
}

/// Apply a validated key/value pair to `config`.
///
/// # Errors
///
/// Returns an error if the key is unknown or the value is invalid.
pub fn apply_config_value(config: &mut RescueConfig, key: &str, value: &str) -> Result<()> {
    validate_config_key(key)?;
    validate_config_value(config, key, value)?;
    match key {
        "rescue.image" => config.rescue.image = Some(value.to_string()),
        "rescue.disk_type" => config.rescue.disk_type = value.to_string(),
        "rescue.mount_point" => config.rescue.mount_point = value.to_string(),
        "rescue.startup_script" => config.rescue.startup_script = Some(PathBuf::from(value)),
        "poll.initial_interval_secs" => config.poll.initial_interval_secs = value.parse()?,
        "poll.max_interval_secs" => config.poll.max_interval_secs = value.parse()?,
        "poll.timeout_secs" => config.poll.timeout_secs = value.parse()?,
        "api.max_retries" => config.api.max_retries = value.parse()?,
        _ => anyhow::bail!("Unknown setting: {key}"),
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
