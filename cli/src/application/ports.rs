//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::error::ComputeError;
use crate::domain::instance::{
    Disk, Instance, MetadataItem, Operation, ZoneRef, validate_resource_name,
};
use crate::domain::RescueConfig;

// ── Value Types ───────────────────────────────────────────────────────────────

/// Parameters for snapshotting a zonal disk.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotRequest<'a> {
    pub disk_name: &'a str,
    pub snapshot_name: &'a str,
}

/// Parameters for creating a disk from an image.
#[derive(Debug, Clone, Copy)]
pub struct CreateDiskRequest<'a> {
    pub disk_name: &'a str,
    /// Image path, e.g. `projects/debian-cloud/global/images/family/debian-10`.
    pub source_image: &'a str,
    /// Disk type identifier, e.g. `pd-balanced`.
    pub disk_type: &'a str,
}

/// Parameters for attaching an existing disk to an instance.
#[derive(Debug, Clone, Copy)]
pub struct AttachDiskRequest<'a> {
    pub disk_name: &'a str,
    pub device_name: &'a str,
    pub boot: bool,
}

/// Parameters for replacing instance metadata.
#[derive(Debug, Clone, Copy)]
pub struct SetMetadataRequest<'a> {
    /// Fingerprint of the metadata being replaced.
    pub fingerprint: &'a str,
    pub items: &'a [MetadataItem],
}

impl SnapshotRequest<'_> {
    /// # Errors
    ///
    /// Returns `InvalidRequest` if either name is malformed.
    pub fn validate(&self) -> Result<(), ComputeError> {
        validate_resource_name("disk", self.disk_name)?;
        validate_resource_name("snapshot", self.snapshot_name)
    }
}

impl CreateDiskRequest<'_> {
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the disk name is malformed or the image or
    /// disk type is empty.
    pub fn validate(&self) -> Result<(), ComputeError> {
        validate_resource_name("disk", self.disk_name)?;
        if self.source_image.is_empty() || self.disk_type.is_empty() {
            return Err(ComputeError::InvalidRequest {
                message: format!("disk '{}' needs a source image and a disk type", self.disk_name),
            });
        }
        Ok(())
    }
}

impl AttachDiskRequest<'_> {
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the disk or device name is malformed.
    pub fn validate(&self) -> Result<(), ComputeError> {
        validate_resource_name("disk", self.disk_name)?;
        validate_resource_name("device", self.device_name)
    }
}

impl SetMetadataRequest<'_> {
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the fingerprint is missing or a key repeats.
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.fingerprint.is_empty() {
            return Err(ComputeError::InvalidRequest {
                message: "metadata writes require the current fingerprint".to_string(),
            });
        }
        for (i, item) in self.items.iter().enumerate() {
            if self.items[..i].iter().any(|prev| prev.key == item.key) {
                return Err(ComputeError::InvalidRequest {
                    message: format!("duplicate metadata key '{}'", item.key),
                });
            }
        }
        Ok(())
    }
}

// ── Compute Port ──────────────────────────────────────────────────────────────

/// Cloud compute control plane: instance and disk lifecycle plus the
/// long-running operations they return.
///
/// Mutating calls return an operation handle that must be polled with
/// `get_operation` until it reaches `DONE`.
#[allow(async_fn_in_trait)]
pub trait ComputeProvider {
    /// Fetch one instance. Fails with `NotFound` if absent.
    async fn get_instance(&self, zone: &ZoneRef, instance: &str) -> Result<Instance, ComputeError>;
    /// Start a stopped instance.
    async fn start_instance(&self, zone: &ZoneRef, instance: &str)
    -> Result<Operation, ComputeError>;
    /// Stop a running instance.
    async fn stop_instance(&self, zone: &ZoneRef, instance: &str)
    -> Result<Operation, ComputeError>;
    /// Snapshot a zonal disk.
    async fn create_snapshot(
        &self,
        zone: &ZoneRef,
        req: &SnapshotRequest<'_>,
    ) -> Result<Operation, ComputeError>;
    /// Fetch one disk. Fails with `NotFound` if absent.
    async fn get_disk(&self, zone: &ZoneRef, disk: &str) -> Result<Disk, ComputeError>;
    /// Create a disk from an image.
    async fn create_disk(
        &self,
        zone: &ZoneRef,
        req: &CreateDiskRequest<'_>,
    ) -> Result<Operation, ComputeError>;
    /// Delete a disk.
    async fn delete_disk(&self, zone: &ZoneRef, disk: &str) -> Result<Operation, ComputeError>;
    /// Attach a disk to an instance.
    async fn attach_disk(
        &self,
        zone: &ZoneRef,
        instance: &str,
        req: &AttachDiskRequest<'_>,
    ) -> Result<Operation, ComputeError>;
    /// Detach the disk attached under `device_name`.
    async fn detach_disk(
        &self,
        zone: &ZoneRef,
        instance: &str,
        device_name: &str,
    ) -> Result<Operation, ComputeError>;
    /// Replace all instance metadata items.
    async fn set_metadata(
        &self,
        zone: &ZoneRef,
        instance: &str,
        req: &SetMetadataRequest<'_>,
    ) -> Result<Operation, ComputeError>;
    /// Current status of a zonal operation.
    async fn get_operation(&self, zone: &ZoneRef, operation: &str)
    -> Result<Operation, ComputeError>;
}

// ── Time Ports ────────────────────────────────────────────────────────────────

/// Suspends the caller between operation polls.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Wall clock used to mint session ids.
pub trait Clock {
    /// Seconds since the unix epoch.
    fn now_unix(&self) -> i64;
}

// ── Process Port ──────────────────────────────────────────────────────────────

/// Runs external programs with a timeout.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run `program` with `args`, killing it if it exceeds the timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait: no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load configuration, falling back to defaults when none is stored.
    fn load(&self) -> Result<RescueConfig>;
    /// Persist configuration.
    fn save(&self, config: &RescueConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
