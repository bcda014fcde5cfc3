//! In-memory doubles for the application ports.
//!
//! `FakeCompute` models one zone: instances, disks and snapshots live in a
//! map, every call is logged, and operations complete on the first poll
//! unless a status sequence was scripted. It enforces the control-plane
//! rules the workflows rely on: one boot disk per instance, no attaching a
//! disk that is in use, no deleting an attached disk, and fingerprint
//! checks on metadata writes.

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    AttachDiskRequest, Clock, ComputeProvider, CreateDiskRequest, ProgressReporter,
    SetMetadataRequest, Sleeper, SnapshotRequest,
};
use crate::domain::error::ComputeError;
use crate::domain::instance::{
    AttachedDisk, Disk, Instance, InstanceStatus, Metadata, MetadataItem, Operation,
    OperationFailure, OperationStatus, ZoneRef,
};

// ── FakeCompute ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeState {
    instances: BTreeMap<String, Instance>,
    disks: BTreeMap<String, Disk>,
    snapshots: Vec<String>,
    calls: Vec<String>,
    operations: HashMap<String, Operation>,
    scripted: VecDeque<Operation>,
    fail_next: HashMap<&'static str, ComputeError>,
    fail_operation: HashMap<&'static str, OperationFailure>,
    next_op: u32,
    fingerprint: u32,
}

impl FakeState {
    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    fn take_failure(&mut self, method: &'static str) -> Result<(), ComputeError> {
        match self.fail_next.remove(method) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// New operation handle. When a failure was scripted for `method` the
    /// operation finishes with it and `apply` is skipped.
    fn operation(
        &mut self,
        method: &'static str,
        apply: impl FnOnce(&mut Self) -> Result<(), ComputeError>,
    ) -> Result<Operation, ComputeError> {
        self.next_op += 1;
        let name = format!("operation-{}", self.next_op);
        let error = self.fail_operation.remove(method);
        if error.is_none() {
            apply(self)?;
        }
        self.operations.insert(
            name.clone(),
            Operation {
                name: name.clone(),
                status: OperationStatus::Done,
                error,
            },
        );
        Ok(Operation::pending(name))
    }

    fn instance_mut(&mut self, name: &str) -> Result<&mut Instance, ComputeError> {
        self.instances
            .get_mut(name)
            .ok_or_else(|| ComputeError::not_found(format!("instance {name}")))
    }

    fn next_fingerprint(&mut self) -> String {
        self.fingerprint += 1;
        format!("fp-{}", self.fingerprint)
    }
}

fn bad_request(message: impl Into<String>) -> ComputeError {
    ComputeError::Api {
        status: 400,
        message: message.into(),
    }
}

fn instance_uri(zone: &ZoneRef, instance: &str) -> String {
    format!(
        "projects/{}/zones/{}/instances/{instance}",
        zone.project, zone.zone
    )
}

/// In-memory `ComputeProvider`.
#[derive(Default)]
pub struct FakeCompute {
    state: RefCell<FakeState>,
}

impl FakeCompute {
    /// A fake holding `instance`; each attached disk is registered as a
    /// disk resource used by it.
    #[must_use]
    pub fn with_instance(zone: &ZoneRef, instance: Instance) -> Self {
        let fake = Self::default();
        fake.insert_instance(zone, instance);
        fake
    }

    pub fn insert_instance(&self, zone: &ZoneRef, instance: Instance) {
        let mut state = self.state.borrow_mut();
        for attached in &instance.disks {
            state.disks.insert(
                attached.name.clone(),
                Disk {
                    name: attached.name.clone(),
                    source_image: None,
                    users: vec![instance_uri(zone, &instance.name)],
                },
            );
        }
        state.instances.insert(instance.name.clone(), instance);
    }

    pub fn insert_disk(&self, disk: Disk) {
        self.state.borrow_mut().disks.insert(disk.name.clone(), disk);
    }

    /// Statuses returned by the next `get_operation` calls, in order.
    pub fn script_operation(&self, statuses: Vec<Operation>) {
        self.state.borrow_mut().scripted.extend(statuses);
    }

    /// Make the next call to `method` fail with `err`.
    pub fn fail_next(&self, method: &'static str, err: ComputeError) {
        self.state.borrow_mut().fail_next.insert(method, err);
    }

    /// Make the operation returned by the next call to `method` finish
    /// with `failure` instead of applying its effect.
    pub fn fail_operation(&self, method: &'static str, failure: OperationFailure) {
        self.state.borrow_mut().fail_operation.insert(method, failure);
    }

    /// Simulate a concurrent metadata writer by rotating the fingerprint.
    pub fn touch_metadata(&self, instance: &str) {
        let mut state = self.state.borrow_mut();
        let fingerprint = state.next_fingerprint();
        if let Some(vm) = state.instances.get_mut(instance) {
            vm.metadata.fingerprint = fingerprint;
        }
    }

    #[must_use]
    pub fn instance(&self, name: &str) -> Option<Instance> {
        self.state.borrow().instances.get(name).cloned()
    }

    #[must_use]
    pub fn disk(&self, name: &str) -> Option<Disk> {
        self.state.borrow().disks.get(name).cloned()
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<String> {
        self.state.borrow().snapshots.clone()
    }

    /// Every call in order, e.g. `"attach_disk linux boot=false"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Calls other than reads and operation polls.
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("get_"))
            .collect()
    }

    #[must_use]
    pub fn calls_to(&self, method: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.split(' ').next() == Some(method))
            .count()
    }
}

impl ComputeProvider for FakeCompute {
    async fn get_instance(&self, _zone: &ZoneRef, instance: &str) -> Result<Instance, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!("get_instance {instance}"));
        state.take_failure("get_instance")?;
        state
            .instances
            .get(instance)
            .cloned()
            .ok_or_else(|| ComputeError::not_found(format!("instance {instance}")))
    }

    async fn start_instance(&self, _zone: &ZoneRef, instance: &str) -> Result<Operation, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!("start_instance {instance}"));
        state.take_failure("start_instance")?;
        state.operation("start_instance", |s| {
            let vm = s.instance_mut(instance)?;
            if vm.boot_disk().is_none() {
                return Err(bad_request("instance has no boot disk"));
            }
            vm.status = InstanceStatus::Running;
            Ok(())
        })
    }

    async fn stop_instance(&self, _zone: &ZoneRef, instance: &str) -> Result<Operation, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!("stop_instance {instance}"));
        state.take_failure("stop_instance")?;
        state.operation("stop_instance", |s| {
            s.instance_mut(instance)?.status = InstanceStatus::Terminated;
            Ok(())
        })
    }

    async fn create_snapshot(
        &self,
        _zone: &ZoneRef,
        req: &SnapshotRequest<'_>,
    ) -> Result<Operation, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!("create_snapshot {} {}", req.disk_name, req.snapshot_name));
        state.take_failure("create_snapshot")?;
        if !state.disks.contains_key(req.disk_name) {
            return Err(ComputeError::not_found(format!("disk {}", req.disk_name)));
        }
        if state.snapshots.iter().any(|s| s == req.snapshot_name) {
            return Err(ComputeError::Conflict {
                resource: format!("snapshot {}", req.snapshot_name),
                message: "already exists".to_string(),
            });
        }
        let snapshot = req.snapshot_name.to_string();
        state.operation("create_snapshot", move |s| {
            s.snapshots.push(snapshot);
            Ok(())
        })
    }

    async fn get_disk(&self, _zone: &ZoneRef, disk: &str) -> Result<Disk, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!("get_disk {disk}"));
        state.take_failure("get_disk")?;
        state
            .disks
            .get(disk)
            .cloned()
            .ok_or_else(|| ComputeError::not_found(format!("disk {disk}")))
    }

    async fn create_disk(
        &self,
        _zone: &ZoneRef,
        req: &CreateDiskRequest<'_>,
    ) -> Result<Operation, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!("create_disk {}", req.disk_name));
        state.take_failure("create_disk")?;
        if state.disks.contains_key(req.disk_name) {
            return Err(ComputeError::Conflict {
                resource: format!("disk {}", req.disk_name),
                message: "already exists".to_string(),
            });
        }
        let disk = Disk {
            name: req.disk_name.to_string(),
            source_image: Some(req.source_image.to_string()),
            users: Vec::new(),
        };
        state.operation("create_disk", move |s| {
            s.disks.insert(disk.name.clone(), disk);
            Ok(())
        })
    }

    async fn delete_disk(&self, _zone: &ZoneRef, disk: &str) -> Result<Operation, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!("delete_disk {disk}"));
        state.take_failure("delete_disk")?;
        match state.disks.get(disk) {
            None => return Err(ComputeError::not_found(format!("disk {disk}"))),
            Some(d) if d.in_use() => {
                return Err(bad_request(format!("disk {disk} is in use")));
            }
            Some(_) => {}
        }
        state.operation("delete_disk", |s| {
            s.disks.remove(disk);
            Ok(())
        })
    }

    async fn attach_disk(
        &self,
        zone: &ZoneRef,
        instance: &str,
        req: &AttachDiskRequest<'_>,
    ) -> Result<Operation, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!(
            "attach_disk {} boot={}",
            req.disk_name, req.boot
        ));
        state.take_failure("attach_disk")?;
        let user = instance_uri(zone, instance);
        match state.disks.get(req.disk_name) {
            None => return Err(ComputeError::not_found(format!("disk {}", req.disk_name))),
            Some(d) if d.in_use() => {
                return Err(bad_request(format!("disk {} is already in use", req.disk_name)));
            }
            Some(_) => {}
        }
        {
            let vm = state.instance_mut(instance)?;
            if req.boot && vm.boot_disk().is_some() {
                return Err(bad_request(format!("instance {instance} already has a boot disk")));
            }
            if vm.disk_by_device(req.device_name).is_some() {
                return Err(bad_request(format!("device {} is already attached", req.device_name)));
            }
        }
        let attached = AttachedDisk::new(req.disk_name, req.device_name, req.boot);
        state.operation("attach_disk", move |s| {
            let vm = s.instance_mut(instance)?;
            if attached.boot {
                vm.disks.insert(0, attached.clone());
            } else {
                vm.disks.push(attached.clone());
            }
            if let Some(disk) = s.disks.get_mut(&attached.name) {
                disk.users = vec![user];
            }
            Ok(())
        })
    }

    async fn detach_disk(
        &self,
        _zone: &ZoneRef,
        instance: &str,
        device_name: &str,
    ) -> Result<Operation, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!("detach_disk {device_name}"));
        state.take_failure("detach_disk")?;
        if state.instance_mut(instance)?.disk_by_device(device_name).is_none() {
            return Err(bad_request(format!("no disk attached as {device_name}")));
        }
        state.operation("detach_disk", |s| {
            let vm = s.instance_mut(instance)?;
            let Some(pos) = vm.disks.iter().position(|d| d.device_name == device_name) else {
                return Ok(());
            };
            let removed = vm.disks.remove(pos);
            if let Some(disk) = s.disks.get_mut(&removed.name) {
                disk.users.clear();
            }
            Ok(())
        })
    }

    async fn set_metadata(
        &self,
        _zone: &ZoneRef,
        instance: &str,
        req: &SetMetadataRequest<'_>,
    ) -> Result<Operation, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!("set_metadata {instance}"));
        state.take_failure("set_metadata")?;
        if state.instance_mut(instance)?.metadata.fingerprint != req.fingerprint {
            return Err(ComputeError::StaleFingerprint {
                resource: format!("instance {instance}"),
            });
        }
        let items: Vec<MetadataItem> = req.items.to_vec();
        state.operation("set_metadata", move |s| {
            let fingerprint = s.next_fingerprint();
            s.instance_mut(instance)?.metadata = Metadata { fingerprint, items };
            Ok(())
        })
    }

    async fn get_operation(&self, _zone: &ZoneRef, operation: &str) -> Result<Operation, ComputeError> {
        let mut state = self.state.borrow_mut();
        state.record(format!("get_operation {operation}"));
        state.take_failure("get_operation")?;
        if let Some(next) = state.scripted.pop_front() {
            return Ok(next);
        }
        Ok(state.operations.get(operation).cloned().unwrap_or(Operation {
            name: operation.to_string(),
            status: OperationStatus::Done,
            error: None,
        }))
    }
}

// ── Time and reporting doubles ───────────────────────────────────────────────

/// Sleeper that returns immediately and records the requested durations.
#[derive(Default)]
pub struct InstantSleeper {
    sleeps: RefCell<Vec<Duration>>,
    cancel_on_sleep: Option<CancellationToken>,
}

impl InstantSleeper {
    /// Sleeper that fires `token` the first time it is asked to sleep.
    #[must_use]
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            sleeps: RefCell::default(),
            cancel_on_sleep: Some(token),
        }
    }

    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        if let Some(token) = &self.cancel_on_sleep {
            token.cancel();
        }
    }
}

/// Clock frozen at a unix timestamp.
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0
    }
}

/// Reporter that keeps every message, prefixed with its kind.
#[derive(Default)]
pub struct RecordingReporter {
    messages: RefCell<Vec<String>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.messages.borrow_mut().push(format!("step: {message}"));
    }

    fn success(&self, message: &str) {
        self.messages.borrow_mut().push(format!("success: {message}"));
    }

    fn warn(&self, message: &str) {
        self.messages.borrow_mut().push(format!("warn: {message}"));
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// A running instance named `name` booting from a disk called `boot`
/// (device name equal to the disk name).
#[must_use]
pub fn running_instance(name: &str, boot: &str) -> Instance {
    Instance {
        name: name.to_string(),
        status: InstanceStatus::Running,
        metadata: Metadata {
            fingerprint: "fp-0".to_string(),
            items: Vec::new(),
        },
        disks: vec![AttachedDisk::new(boot, boot, true)],
    }
}
