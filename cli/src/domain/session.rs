//! Rescue session identity: mode detection, session ids and derived names.
//!
//! Pure functions only. The session id is the single source of truth for
//! whether rescue mode is active; every resource name a session touches is
//! derived from it and from identifiers captured before any mutation.

use std::fmt;

use serde::Serialize;

use crate::domain::error::{ComputeError, RescueError};
use crate::domain::instance::{AttachedDisk, Instance, Metadata, validate_resource_name};
use crate::domain::metadata::{ORIGINAL_DEVICE_KEY, ORIGINAL_DISK_KEY, RESCUE_MODE_KEY};

const RESCUE_DISK_INFIX: &str = "-rescue-disk-";

// ── Session id ───────────────────────────────────────────────────────────────

/// Timestamp-derived identifier of one rescue episode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Session id for a unix timestamp (second resolution).
    #[must_use]
    pub fn from_unix(seconds: i64) -> Self {
        Self(seconds.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Mode detection ───────────────────────────────────────────────────────────

/// Result of inspecting instance metadata for an active rescue session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDetection {
    pub active: bool,
    pub session_id: SessionId,
}

/// Decide whether rescue mode is already active.
///
/// The `rescue-mode` item's value becomes the session id when present;
/// otherwise `fresh` supplies a new one. Never fails.
pub fn detect_mode(metadata: &Metadata, fresh: impl FnOnce() -> SessionId) -> ModeDetection {
    match metadata.get(RESCUE_MODE_KEY) {
        Some(value) => ModeDetection {
            active: true,
            session_id: SessionId::from(value),
        },
        None => ModeDetection {
            active: false,
            session_id: fresh(),
        },
    }
}

// ── Derived names ────────────────────────────────────────────────────────────

/// Name of the rescue disk for a session: `<device>-rescue-disk-<id>`.
#[must_use]
pub fn rescue_disk_name(device_name: &str, id: &SessionId) -> String {
    format!("{device_name}{RESCUE_DISK_INFIX}{id}")
}

/// Name of the backup snapshot of the original disk: `<disk>-<id>`.
#[must_use]
pub fn snapshot_name(disk_name: &str, id: &SessionId) -> String {
    format!("{disk_name}-{id}")
}

/// Inverse of [`rescue_disk_name`] for a known session id.
#[must_use]
pub fn original_device_from_rescue_disk<'a>(rescue_disk: &'a str, id: &SessionId) -> Option<&'a str> {
    rescue_disk
        .strip_suffix(id.as_str())
        .and_then(|rest| rest.strip_suffix(RESCUE_DISK_INFIX))
        .filter(|device| !device.is_empty())
}

/// Session id and original device of a rescue disk that boots an instance
/// without a rescue marker.
///
/// That layout is left behind when a rescue run stops between swapping
/// the boot disk and writing metadata. Matches `<device>-rescue-disk-<digits>`
/// against the attachment's device name, then its disk name.
#[must_use]
pub fn interrupted_session(boot_disk: &AttachedDisk) -> Option<(SessionId, String)> {
    [&boot_disk.device_name, &boot_disk.name]
        .into_iter()
        .find_map(|name| {
            let (device, id) = name.rsplit_once(RESCUE_DISK_INFIX)?;
            let numeric = !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit());
            (numeric && !device.is_empty()).then(|| (SessionId::from(id), device.to_string()))
        })
}

// ── Session ──────────────────────────────────────────────────────────────────

/// Immutable description of one rescue episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RescueSession {
    id: SessionId,
    original_disk_name: String,
    original_device_name: String,
    rescue_disk_name: String,
    rescue_source_image: String,
}

impl RescueSession {
    /// Start a session from the instance's current boot disk.
    #[must_use]
    pub fn begin(id: SessionId, boot_disk: &AttachedDisk, source_image: &str) -> Self {
        Self::from_parts(id, &boot_disk.name, &boot_disk.device_name, source_image)
    }

    fn from_parts(id: SessionId, disk: &str, device: &str, source_image: &str) -> Self {
        let rescue_disk_name = rescue_disk_name(device, &id);
        Self {
            id,
            original_disk_name: disk.to_string(),
            original_device_name: device.to_string(),
            rescue_disk_name,
            rescue_source_image: source_image.to_string(),
        }
    }

    /// Rebuild a session that an earlier run recorded on the instance.
    ///
    /// The session record items written with the rescue marker are
    /// preferred. Without them the original device name is recovered from
    /// the attached rescue disk's device name and the disk name from the
    /// attachment carrying that device.
    ///
    /// # Errors
    ///
    /// Returns `OriginalDiskUnknown` when neither source identifies the
    /// original disk.
    pub fn recover(
        instance: &Instance,
        id: SessionId,
        source_image: &str,
    ) -> Result<Self, RescueError> {
        let metadata = &instance.metadata;
        let device = metadata
            .get(ORIGINAL_DEVICE_KEY)
            .map(str::to_owned)
            .or_else(|| {
                instance
                    .disks
                    .iter()
                    .find_map(|d| original_device_from_rescue_disk(&d.device_name, &id))
                    .map(str::to_owned)
            });
        let disk = metadata.get(ORIGINAL_DISK_KEY).map(str::to_owned).or_else(|| {
            device
                .as_deref()
                .and_then(|dev| instance.disk_by_device(dev))
                .map(|d| d.name.clone())
        });

        match (disk, device) {
            (Some(disk), Some(device)) => Ok(Self::from_parts(id, &disk, &device, source_image)),
            _ => Err(RescueError::OriginalDiskUnknown {
                instance: instance.name.clone(),
                session_id: id.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn original_disk_name(&self) -> &str {
        &self.original_disk_name
    }

    #[must_use]
    pub fn original_device_name(&self) -> &str {
        &self.original_device_name
    }

    #[must_use]
    pub fn rescue_disk_name(&self) -> &str {
        &self.rescue_disk_name
    }

    #[must_use]
    pub fn rescue_source_image(&self) -> &str {
        &self.rescue_source_image
    }

    #[must_use]
    pub fn snapshot_name(&self) -> String {
        snapshot_name(&self.original_disk_name, &self.id)
    }

    /// Check every name this session will create.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when a derived name is not a valid resource
    /// name, e.g. because the original device name is too long.
    pub fn validate_names(&self) -> Result<(), ComputeError> {
        validate_resource_name("disk", &self.rescue_disk_name)?;
        validate_resource_name("snapshot", &self.snapshot_name())
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
