//! Compute resource model: instances, disks, metadata and long-running
//! operations as the rescue workflows see them.
//!
//! Pure data only. The provider adapter in `crate::infra` converts wire
//! payloads into these types; nothing here knows about HTTP or JSON.

use std::fmt;

use serde::Serialize;

use crate::domain::error::ComputeError;

// ── Coordinates ──────────────────────────────────────────────────────────────

/// The `{project, zone}` pair that qualifies every provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneRef {
    pub project: String,
    pub zone: String,
}

impl ZoneRef {
    #[must_use]
    pub fn new(project: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
        }
    }
}

impl fmt::Display for ZoneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.zone)
    }
}

// ── Instance ─────────────────────────────────────────────────────────────────

/// Instance lifecycle status, reduced to what the workflows act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Running,
    Terminated,
    Unknown,
}

impl InstanceStatus {
    /// Map a Compute Engine status string. Transitional states such as
    /// `STOPPING` or `SUSPENDED` collapse to `Unknown`.
    #[must_use]
    pub fn from_api(value: &str) -> Self {
        match value {
            "RUNNING" => Self::Running,
            "TERMINATED" => Self::Terminated,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Terminated => "TERMINATED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A disk as attached to an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachedDisk {
    /// Disk resource name (last segment of the attachment's source URL).
    pub name: String,
    /// Instance-local attachment name; may differ from `name`.
    pub device_name: String,
    pub boot: bool,
}

impl AttachedDisk {
    #[must_use]
    pub fn new(name: impl Into<String>, device_name: impl Into<String>, boot: bool) -> Self {
        Self {
            name: name.into(),
            device_name: device_name.into(),
            boot,
        }
    }
}

/// Snapshot of one instance as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub status: InstanceStatus,
    pub metadata: Metadata,
    /// Attached disks in attachment order.
    pub disks: Vec<AttachedDisk>,
}

impl Instance {
    /// The disk flagged as boot device, if any.
    #[must_use]
    pub fn boot_disk(&self) -> Option<&AttachedDisk> {
        self.disks.iter().find(|d| d.boot)
    }

    /// The attached disk with the given device name, if any.
    #[must_use]
    pub fn disk_by_device(&self, device_name: &str) -> Option<&AttachedDisk> {
        self.disks.iter().find(|d| d.device_name == device_name)
    }
}

// ── Disk ─────────────────────────────────────────────────────────────────────

/// A zonal persistent disk resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disk {
    pub name: String,
    pub source_image: Option<String>,
    /// URIs of instances currently using the disk.
    pub users: Vec<String>,
}

impl Disk {
    #[must_use]
    pub fn in_use(&self) -> bool {
        !self.users.is_empty()
    }
}

// ── Metadata ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

impl MetadataItem {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Instance metadata: a version fingerprint plus ordered key/value items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Opaque token; writes carrying a stale value are rejected.
    pub fingerprint: String,
    pub items: Vec<MetadataItem>,
}

impl Metadata {
    /// Value of the first item with `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.key == key)
            .map(|item| item.value.as_str())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
}

impl OperationStatus {
    /// Unknown strings are treated as still running so the waiter keeps polling.
    #[must_use]
    pub fn from_api(value: &str) -> Self {
        match value {
            "DONE" => Self::Done,
            "PENDING" => Self::Pending,
            _ => Self::Running,
        }
    }
}

/// One entry of an operation's error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationErrorEntry {
    pub code: String,
    pub message: String,
}

/// Error payload attached to an operation that finished unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationFailure {
    pub errors: Vec<OperationErrorEntry>,
}

impl OperationFailure {
    #[must_use]
    pub fn single(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![OperationErrorEntry {
                code: code.into(),
                message: message.into(),
            }],
        }
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("operation reported an empty error payload");
        }
        for (i, entry) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", entry.code, entry.message)?;
        }
        Ok(())
    }
}

/// Handle to a long-running control-plane operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub status: OperationStatus,
    /// Only present once `status` is `Done` and the operation failed.
    pub error: Option<OperationFailure>,
}

impl Operation {
    #[must_use]
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: OperationStatus::Pending,
            error: None,
        }
    }
}

// ── Resource names ───────────────────────────────────────────────────────────

/// Maximum length of a Compute Engine resource name.
pub const MAX_RESOURCE_NAME_LEN: usize = 63;

/// Check a resource name against `[a-z]([-a-z0-9]*[a-z0-9])?`, 1–63 chars.
///
/// # Errors
///
/// Returns `InvalidRequest` naming `kind` when the name is malformed.
pub fn validate_resource_name(kind: &str, name: &str) -> Result<(), ComputeError> {
    let bytes = name.as_bytes();
    let well_formed = !bytes.is_empty()
        && bytes.len() <= MAX_RESOURCE_NAME_LEN
        && bytes[0].is_ascii_lowercase()
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes.last().is_some_and(|b| *b != b'-');
    if well_formed {
        Ok(())
    } else {
        Err(ComputeError::InvalidRequest {
            message: format!(
                "{kind} name '{name}' must be 1-{MAX_RESOURCE_NAME_LEN} characters of lowercase letters, digits and hyphens, start with a letter and not end with a hyphen"
            ),
        })
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn instance(disks: Vec<AttachedDisk>) -> Instance {
        Instance {
            name: "vm".to_string(),
            status: InstanceStatus::Running,
            metadata: Metadata::default(),
            disks,
        }
    }

    #[test]
    fn test_instance_status_from_api_collapses_transitional_states() {
        assert_eq!(InstanceStatus::from_api("RUNNING"), InstanceStatus::Running);
        assert_eq!(
            InstanceStatus::from_api("TERMINATED"),
            InstanceStatus::Terminated
        );
        assert_eq!(InstanceStatus::from_api("STOPPING"), InstanceStatus::Unknown);
        assert_eq!(InstanceStatus::from_api(""), InstanceStatus::Unknown);
    }

    #[test]
    fn test_operation_status_unknown_string_keeps_polling() {
        assert_eq!(OperationStatus::from_api("DONE"), OperationStatus::Done);
        assert_eq!(OperationStatus::from_api("PENDING"), OperationStatus::Pending);
        assert_eq!(OperationStatus::from_api("RUNNING"), OperationStatus::Running);
        assert_eq!(OperationStatus::from_api("WEIRD"), OperationStatus::Running);
    }

    #[test]
    fn test_boot_disk_finds_flagged_disk() {
        let vm = instance(vec![
            AttachedDisk::new("data", "data", false),
            AttachedDisk::new("linux", "persistent-disk-0", true),
        ]);
        let boot = vm.boot_disk().expect("boot disk");
        assert_eq!(boot.name, "linux");
        assert_eq!(boot.device_name, "persistent-disk-0");
    }

    #[test]
    fn test_boot_disk_none_when_nothing_flagged() {
        let vm = instance(vec![AttachedDisk::new("data", "data", false)]);
        assert!(vm.boot_disk().is_none());
    }

    #[test]
    fn test_disk_by_device_matches_device_not_name() {
        let vm = instance(vec![AttachedDisk::new("linux", "root", true)]);
        assert!(vm.disk_by_device("root").is_some());
        assert!(vm.disk_by_device("linux").is_none());
    }

    #[test]
    fn test_metadata_get_returns_first_match() {
        let md = Metadata {
            fingerprint: "abc".to_string(),
            items: vec![
                MetadataItem::new("rescue-mode", "1700000000"),
                MetadataItem::new("rescue-mode", "shadowed"),
            ],
        };
        assert_eq!(md.get("rescue-mode"), Some("1700000000"));
        assert!(!md.contains("startup-script"));
    }

    #[test]
    fn test_operation_failure_display_joins_entries() {
        let failure = OperationFailure {
            errors: vec![
                OperationErrorEntry {
                    code: "RESOURCE_IN_USE".to_string(),
                    message: "disk busy".to_string(),
                },
                OperationErrorEntry {
                    code: "QUOTA".to_string(),
                    message: "no quota".to_string(),
                },
            ],
        };
        assert_eq!(
            failure.to_string(),
            "RESOURCE_IN_USE: disk busy; QUOTA: no quota"
        );
    }

    #[test]
    fn test_validate_resource_name_accepts_rescue_disk_names() {
        assert!(validate_resource_name("disk", "linux-rescue-disk-1690000000").is_ok());
        assert!(validate_resource_name("disk", "a").is_ok());
    }

    #[test]
    fn test_validate_resource_name_rejects_malformed() {
        let long = "a".repeat(64);
        for bad in ["", "1disk", "Disk", "disk-", "disk_name", long.as_str()] {
            assert!(validate_resource_name("disk", bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_disk_in_use_reflects_users() {
        let mut disk = Disk {
            name: "d".to_string(),
            source_image: None,
            users: Vec::new(),
        };
        assert!(!disk.in_use());
        disk.users.push("projects/p/zones/z/instances/other".to_string());
        assert!(disk.in_use());
    }
}
