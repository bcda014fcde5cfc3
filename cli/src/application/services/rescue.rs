//! Rescue workflow: boot the instance from a fresh recovery disk and
//! attach the original boot disk as secondary storage.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use serde::Serialize;
use tracing::{info, warn};

use crate::application::ports::{
    Clock, ComputeProvider, CreateDiskRequest, ProgressReporter, Sleeper, SnapshotRequest,
};
use crate::application::services::context::InstanceContext;
use crate::application::services::steps::{RescueSettings, StepExecutor, record, skip};
use crate::domain::error::RescueError;
use crate::domain::instance::ZoneRef;
use crate::domain::metadata;
use crate::domain::session::{RescueSession, interrupted_session};
use crate::domain::step::Step;

/// Result of entering rescue mode.
#[derive(Debug, Clone, Serialize)]
pub struct RescueOutcome {
    pub session: RescueSession,
    /// `true` when an earlier run had already written the rescue marker.
    pub resumed: bool,
}

/// Forward state machine into rescue mode.
pub struct RescueWorkflow<'a, P, S, R> {
    exec: &'a StepExecutor<'a, P, S, R>,
    settings: &'a RescueSettings,
}

impl<'a, P, S, R> RescueWorkflow<'a, P, S, R>
where
    P: ComputeProvider,
    S: Sleeper,
    R: ProgressReporter,
{
    #[must_use]
    pub fn new(exec: &'a StepExecutor<'a, P, S, R>, settings: &'a RescueSettings) -> Self {
        Self { exec, settings }
    }

    /// Run every rescue step in order, or only the tail of the sequence
    /// when `ctx` already carries the rescue marker.
    ///
    /// Nothing is rolled back on failure; the error names the failing step
    /// and the last one that completed.
    ///
    /// # Errors
    ///
    /// Returns, before any mutation, `MissingBootDisk` when the instance has
    /// no boot disk, `InterruptedRescue` when it boots from an unrecorded
    /// rescue disk, and `InvalidRequest` when a derived name is malformed.
    /// Any step failure is returned as `StepFailed`.
    pub async fn run(&self, ctx: &mut InstanceContext) -> Result<RescueOutcome, RescueError> {
        if ctx.is_rescue_active() {
            return self.resume(ctx).await;
        }

        let boot = ctx
            .snapshot()
            .boot_disk()
            .cloned()
            .ok_or_else(|| RescueError::MissingBootDisk {
                instance: ctx.name().to_string(),
            })?;
        if let Some((session_id, original_device)) = interrupted_session(&boot) {
            warn!(instance = ctx.name(), boot_disk = %boot.name, %session_id, "boot disk belongs to an interrupted rescue");
            return Err(RescueError::InterruptedRescue {
                instance: ctx.name().to_string(),
                boot_disk: boot.name,
                session_id: session_id.to_string(),
                original_device,
            });
        }
        let session = RescueSession::begin(ctx.session_id().clone(), &boot, &self.settings.source_image);
        session.validate_names()?;
        info!(
            instance = ctx.name(),
            session = %session.id(),
            original_disk = session.original_disk_name(),
            rescue_disk = session.rescue_disk_name(),
            "entering rescue mode"
        );

        let exec = self.exec;
        let mut last = None;
        record(Step::StopInstance, &mut last, exec.stop_instance(ctx).await)?;
        record(
            Step::BackupOriginalDisk,
            &mut last,
            self.backup_original_disk(ctx.zone(), &session).await,
        )?;
        record(
            Step::CreateRescueDisk,
            &mut last,
            self.create_rescue_disk(ctx.zone(), &session).await,
        )?;
        record(
            Step::DetachOriginalBootDisk,
            &mut last,
            exec.detach_disk(ctx, session.original_device_name()).await,
        )?;
        record(
            Step::AttachRescueDiskAsBoot,
            &mut last,
            exec.attach_disk(ctx, session.rescue_disk_name(), session.rescue_disk_name(), true)
                .await,
        )?;
        record(
            Step::SetMetadata,
            &mut last,
            self.set_rescue_metadata(ctx, &session).await,
        )?;
        self.finish(ctx, &session, last).await?;

        Ok(RescueOutcome {
            session,
            resumed: false,
        })
    }

    /// The marker is written by `SetMetadata`, so everything up to it has
    /// already happened.
    async fn resume(&self, ctx: &mut InstanceContext) -> Result<RescueOutcome, RescueError> {
        let session = RescueSession::recover(
            ctx.snapshot(),
            ctx.session_id().clone(),
            &self.settings.source_image,
        )?;
        info!(instance = ctx.name(), session = %session.id(), "rescue mode already active; resuming");
        self.exec
            .reporter()
            .success(&format!("Rescue mode already active (session {})", session.id()));
        self.finish(ctx, &session, Some(Step::SetMetadata)).await?;
        Ok(RescueOutcome {
            session,
            resumed: true,
        })
    }

    async fn finish(
        &self,
        ctx: &mut InstanceContext,
        session: &RescueSession,
        mut last: Option<Step>,
    ) -> Result<(), RescueError> {
        record(Step::StartInstance, &mut last, self.exec.start_instance(ctx).await)?;
        if ctx
            .snapshot()
            .disk_by_device(session.original_device_name())
            .is_some_and(|d| !d.boot)
        {
            skip(
                Step::AttachOriginalDiskAsSecondary,
                &mut last,
                "original disk already attached",
            );
            return Ok(());
        }
        record(
            Step::AttachOriginalDiskAsSecondary,
            &mut last,
            self.exec
                .attach_disk(
                    ctx,
                    session.original_disk_name(),
                    session.original_device_name(),
                    false,
                )
                .await,
        )?;
        Ok(())
    }

    /// Snapshot the original boot disk as `<disk>-<session>`.
    async fn backup_original_disk(&self, zone: &ZoneRef, session: &RescueSession) -> Result<(), RescueError> {
        let snapshot_name = session.snapshot_name();
        let req = SnapshotRequest {
            disk_name: session.original_disk_name(),
            snapshot_name: &snapshot_name,
        };
        req.validate()?;
        self.exec
            .reporter()
            .step(&format!("Snapshotting {} as {snapshot_name}", req.disk_name));
        let issued = self.exec.provider().create_snapshot(zone, &req).await;
        self.exec.complete(zone, issued).await?;
        self.exec.reporter().success("Backup snapshot created");
        Ok(())
    }

    /// Make sure the session's rescue disk exists and is free.
    ///
    /// An existing unused disk counts as already provisioned, so running
    /// this twice creates the disk once.
    ///
    /// # Errors
    ///
    /// Returns `DiskInUse` when the disk exists and is attached somewhere,
    /// otherwise propagates provider and waiter errors.
    pub async fn create_rescue_disk(&self, zone: &ZoneRef, session: &RescueSession) -> Result<(), RescueError> {
        let name = session.rescue_disk_name();
        match self.exec.provider().get_disk(zone, name).await {
            Ok(disk) if disk.in_use() => Err(RescueError::DiskInUse {
                disk: disk.name,
                users: disk.users,
            }),
            Ok(_) => {
                info!(disk = name, "rescue disk already provisioned");
                self.exec
                    .reporter()
                    .success(&format!("Rescue disk {name} already exists"));
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                let req = CreateDiskRequest {
                    disk_name: name,
                    source_image: session.rescue_source_image(),
                    disk_type: &self.settings.disk_type,
                };
                req.validate()?;
                self.exec.reporter().step(&format!(
                    "Creating rescue disk {name} from {}",
                    req.source_image
                ));
                let issued = self.exec.provider().create_disk(zone, &req).await;
                self.exec.complete(zone, issued).await?;
                self.exec.reporter().success("Rescue disk created");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn set_rescue_metadata(&self, ctx: &InstanceContext, session: &RescueSession) -> Result<(), RescueError> {
        let script = self
            .settings
            .template
            .render(session.original_device_name(), &self.settings.mount_point);
        self.exec
            .write_metadata(ctx, |current| {
                metadata::rescue_items(current, session, script.clone())
            })
            .await
    }
}

/// Load `instance` and put it into rescue mode.
///
/// # Errors
///
/// Propagates instance lookup and workflow errors.
pub async fn enter_rescue<P, S, R>(
    exec: &StepExecutor<'_, P, S, R>,
    clock: &impl Clock,
    settings: &RescueSettings,
    zone: ZoneRef,
    instance: &str,
) -> Result<RescueOutcome, RescueError>
where
    P: ComputeProvider,
    S: Sleeper,
    R: ProgressReporter,
{
    let mut ctx = InstanceContext::load(exec.provider(), clock, zone, instance).await?;
    RescueWorkflow::new(exec, settings).run(&mut ctx).await
}
