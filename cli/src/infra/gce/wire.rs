//! Compute Engine v1 JSON payloads and their conversion to domain types.

use serde::{Deserialize, Serialize};

use crate::domain::instance::{
    AttachedDisk, Disk, Instance, InstanceStatus, Metadata, MetadataItem, Operation,
    OperationErrorEntry, OperationFailure, OperationStatus,
};

// ── Responses ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceResource {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub metadata: MetadataResource,
    #[serde(default)]
    pub disks: Vec<AttachedDiskResource>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResource {
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub items: Vec<MetadataItemResource>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MetadataItemResource {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDiskResource {
    /// Full or partial URL of the disk resource.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub boot: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskResource {
    pub name: String,
    pub source_image: Option<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResource {
    pub name: String,
    #[serde(default)]
    pub status: String,
    pub error: Option<OperationErrorResource>,
}

#[derive(Debug, Deserialize)]
pub struct OperationErrorResource {
    #[serde(default)]
    pub errors: Vec<OperationErrorEntryResource>,
}

#[derive(Debug, Deserialize)]
pub struct OperationErrorEntryResource {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// `{"error": {"code": 404, "message": "..."}}` body of a failed request.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SnapshotBody<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiskBody<'a> {
    pub name: &'a str,
    pub source_image: &'a str,
    /// `projects/{p}/zones/{z}/diskTypes/{type}`.
    #[serde(rename = "type")]
    pub disk_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachDiskBody<'a> {
    pub boot: bool,
    pub device_name: &'a str,
    /// `projects/{p}/zones/{z}/disks/{disk}`.
    pub source: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub auto_delete: bool,
}

#[derive(Debug, Serialize)]
pub struct SetMetadataBody<'a> {
    pub fingerprint: &'a str,
    pub items: &'a [MetadataItem],
}

// ── Conversions ──────────────────────────────────────────────────────────────

/// Last path segment of a resource URL.
#[must_use]
pub fn resource_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

impl From<InstanceResource> for Instance {
    fn from(r: InstanceResource) -> Self {
        Self {
            status: InstanceStatus::from_api(&r.status),
            name: r.name,
            metadata: r.metadata.into(),
            disks: r
                .disks
                .into_iter()
                .map(|d| AttachedDisk::new(resource_name(&d.source), d.device_name, d.boot))
                .collect(),
        }
    }
}

impl From<MetadataResource> for Metadata {
    fn from(r: MetadataResource) -> Self {
        Self {
            fingerprint: r.fingerprint,
            items: r
                .items
                .into_iter()
                .map(|i| MetadataItem::new(i.key, i.value))
                .collect(),
        }
    }
}

impl From<DiskResource> for Disk {
    fn from(r: DiskResource) -> Self {
        Self {
            name: r.name,
            source_image: r.source_image,
            users: r.users,
        }
    }
}

impl From<OperationResource> for Operation {
    fn from(r: OperationResource) -> Self {
        Self {
            status: OperationStatus::from_api(&r.status),
            name: r.name,
            error: r.error.map(|e| OperationFailure {
                errors: e
                    .errors
                    .into_iter()
                    .map(|entry| OperationErrorEntry {
                        code: entry.code,
                        message: entry.message,
                    })
                    .collect(),
            }),
        }
    }
}
