//! Metadata payloads written to the instance when entering and leaving
//! rescue mode, plus the startup-script template they carry.
//!
//! Pure functions only. Items unrelated to rescue mode are preserved in
//! their original order on every write.

use crate::domain::instance::{Metadata, MetadataItem};
use crate::domain::session::RescueSession;

// ── Keys ─────────────────────────────────────────────────────────────────────

pub const STARTUP_SCRIPT_KEY: &str = "startup-script";
/// Presence alone marks rescue mode as active; the value is the session id.
pub const RESCUE_MODE_KEY: &str = "rescue-mode";
pub const ORIGINAL_DISK_KEY: &str = "rescue-mode-original-disk";
pub const ORIGINAL_DEVICE_KEY: &str = "rescue-mode-original-device";
/// Pre-rescue `startup-script`, kept so restore can put it back.
pub const STARTUP_SCRIPT_BACKUP_KEY: &str = "rescue-mode-startup-script";

const MANAGED_KEYS: &[&str] = &[
    STARTUP_SCRIPT_KEY,
    RESCUE_MODE_KEY,
    ORIGINAL_DISK_KEY,
    ORIGINAL_DEVICE_KEY,
    STARTUP_SCRIPT_BACKUP_KEY,
];

// ── Startup script template ──────────────────────────────────────────────────

/// Literal replaced with the original boot disk's device name.
pub const DISK_PLACEHOLDER: &str = "GOOGLE_DISK_NAME";
/// Literal replaced with the mount point of the original disk.
pub const MOUNT_POINT_PLACEHOLDER: &str = "GOOGLE_MOUNT_POINT";

/// Template shipped with the binary.
pub const DEFAULT_STARTUP_SCRIPT: &str = include_str!("../../assets/startup-script.sh");

/// Startup script run by the rescue boot disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupScriptTemplate(String);

impl StartupScriptTemplate {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    /// Interpolate the device name of the disk to mount and its mount point.
    #[must_use]
    pub fn render(&self, device_name: &str, mount_point: &str) -> String {
        self.0
            .replace(DISK_PLACEHOLDER, device_name)
            .replace(MOUNT_POINT_PLACEHOLDER, mount_point)
    }
}

impl Default for StartupScriptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_STARTUP_SCRIPT)
    }
}

// ── Builders ─────────────────────────────────────────────────────────────────

fn unmanaged(current: &Metadata) -> Vec<MetadataItem> {
    current
        .items
        .iter()
        .filter(|item| !MANAGED_KEYS.contains(&item.key.as_str()))
        .cloned()
        .collect()
}

/// Items for entering rescue mode.
///
/// Replaces `startup-script` with `script`, sets `rescue-mode` to the
/// session id and records the original disk identity. An existing
/// startup script is backed up so restore can reinstate it.
#[must_use]
pub fn rescue_items(current: &Metadata, session: &RescueSession, script: String) -> Vec<MetadataItem> {
    let mut items = unmanaged(current);
    items.push(MetadataItem::new(STARTUP_SCRIPT_KEY, script));
    items.push(MetadataItem::new(RESCUE_MODE_KEY, session.id().as_str()));
    items.push(MetadataItem::new(ORIGINAL_DISK_KEY, session.original_disk_name()));
    items.push(MetadataItem::new(
        ORIGINAL_DEVICE_KEY,
        session.original_device_name(),
    ));
    if let Some(previous) = current.get(STARTUP_SCRIPT_KEY) {
        items.push(MetadataItem::new(STARTUP_SCRIPT_BACKUP_KEY, previous));
    }
    items
}

/// Items for leaving rescue mode.
///
/// Omits `rescue-mode` and the session record entirely, and puts the
/// backed-up startup script back (or omits the key when none existed).
#[must_use]
pub fn restore_items(current: &Metadata) -> Vec<MetadataItem> {
    let mut items = unmanaged(current);
    if let Some(previous) = current.get(STARTUP_SCRIPT_BACKUP_KEY) {
        items.push(MetadataItem::new(STARTUP_SCRIPT_KEY, previous));
    }
    items
}

// ── Unit tests ───────────────────────────────────────────────────────────────
