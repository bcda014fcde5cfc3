//! Restore workflow: put the original boot disk back and remove the
//! rescue disk.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use tracing::{info, warn};

use crate::application::ports::{Clock, ComputeProvider, ProgressReporter, Sleeper};
use crate::application::services::context::InstanceContext;
use crate::application::services::steps::{RescueSettings, StepExecutor, record, skip};
use crate::domain::error::RescueError;
use crate::domain::instance::ZoneRef;
use crate::domain::metadata;
use crate::domain::session::{RescueSession, SessionId};
use crate::domain::step::Step;

/// Result of leaving rescue mode.
///
/// The instance is functionally restored whenever this is returned;
/// `cleanup` carries a `CleanupFailed` error if the rescue disk survived.
#[derive(Debug)]
pub struct RestoreOutcome {
    pub session_id: SessionId,
    pub rescue_disk: String,
    pub cleanup: Result<(), RescueError>,
}

/// Reverse state machine out of rescue mode.
pub struct RestoreWorkflow<'a, P, S, R> {
    exec: &'a StepExecutor<'a, P, S, R>,
    settings: &'a RescueSettings,
}

impl<'a, P, S, R> RestoreWorkflow<'a, P, S, R>
where
    P: ComputeProvider,
    S: Sleeper,
    R: ProgressReporter,
{
    #[must_use]
    pub fn new(exec: &'a StepExecutor<'a, P, S, R>, settings: &'a RescueSettings) -> Self {
        Self { exec, settings }
    }

    /// Run the restore steps in order.
    ///
    /// Disk steps whose end state the instance already shows (judged from
    /// the layout captured in `ctx`) are skipped, so an interrupted restore
    /// can be re-run.
    ///
    /// # Errors
    ///
    /// Returns `NotInRescueMode` when no rescue marker is present,
    /// `OriginalDiskUnknown` when the session cannot be rebuilt, and
    /// `StepFailed` for failures up to and including `StartInstance`.
    /// A failed rescue disk deletion is reported in the outcome instead.
    pub async fn run(&self, ctx: &mut InstanceContext) -> Result<RestoreOutcome, RescueError> {
        if !ctx.is_rescue_active() {
            return Err(RescueError::NotInRescueMode {
                instance: ctx.name().to_string(),
            });
        }
        let session = RescueSession::recover(
            ctx.snapshot(),
            ctx.session_id().clone(),
            &self.settings.source_image,
        )?;
        info!(
            instance = ctx.name(),
            session = %session.id(),
            original_disk = session.original_disk_name(),
            rescue_disk = session.rescue_disk_name(),
            "leaving rescue mode"
        );

        let layout = ctx.snapshot();
        let rescue_attached = layout.disk_by_device(session.rescue_disk_name()).is_some();
        let original = layout.disk_by_device(session.original_device_name());
        let original_secondary = original.is_some_and(|d| !d.boot);
        let original_boot = original.is_some_and(|d| d.boot);

        let exec = self.exec;
        let mut last = None;
        record(Step::StopInstance, &mut last, exec.stop_instance(ctx).await)?;

        if rescue_attached {
            record(
                Step::DetachRescueBootDisk,
                &mut last,
                exec.detach_disk(ctx, session.rescue_disk_name()).await,
            )?;
        } else {
            skip(Step::DetachRescueBootDisk, &mut last, "rescue disk not attached");
        }

        if original_secondary {
            record(
                Step::DetachOriginalSecondaryDisk,
                &mut last,
                exec.detach_disk(ctx, session.original_device_name()).await,
            )?;
        } else {
            skip(
                Step::DetachOriginalSecondaryDisk,
                &mut last,
                "original disk not attached as secondary",
            );
        }

        if original_boot {
            skip(
                Step::AttachOriginalDiskAsBoot,
                &mut last,
                "original disk already boots the instance",
            );
        } else {
            record(
                Step::AttachOriginalDiskAsBoot,
                &mut last,
                exec.attach_disk(
                    ctx,
                    session.original_disk_name(),
                    session.original_device_name(),
                    true,
                )
                .await,
            )?;
        }

        record(
            Step::ResetMetadata,
            &mut last,
            exec.write_metadata(ctx, metadata::restore_items).await,
        )?;
        record(Step::StartInstance, &mut last, exec.start_instance(ctx).await)?;

        let cleanup = self
            .delete_rescue_disk(ctx.zone(), &session)
            .await
            .map_err(|err| {
                warn!(disk = session.rescue_disk_name(), error = %err, "rescue disk cleanup failed");
                exec.reporter()
                    .warn(&format!("Rescue disk {} not deleted", session.rescue_disk_name()));
                RescueError::CleanupFailed {
                    disk: session.rescue_disk_name().to_string(),
                    source: Box::new(err),
                }
            });

        Ok(RestoreOutcome {
            session_id: session.id().clone(),
            rescue_disk: session.rescue_disk_name().to_string(),
            cleanup,
        })
    }

    /// A disk that is already gone counts as deleted.
    async fn delete_rescue_disk(&self, zone: &ZoneRef, session: &RescueSession) -> Result<(), RescueError> {
        let name = session.rescue_disk_name();
        self.exec
            .reporter()
            .step(&format!("Deleting rescue disk {name}"));
        match self.exec.provider().delete_disk(zone, name).await {
            Err(err) if err.is_not_found() => {
                info!(disk = name, "rescue disk already deleted");
            }
            issued => {
                self.exec.complete(zone, issued).await?;
            }
        }
        info!(step = %Step::DeleteRescueDisk, "step completed");
        self.exec.reporter().success("Rescue disk deleted");
        Ok(())
    }
}

/// Load `instance` and take it out of rescue mode.
///
/// # Errors
///
/// Propagates instance lookup and workflow errors.
pub async fn exit_rescue<P, S, R>(
    exec: &StepExecutor<'_, P, S, R>,
    clock: &impl Clock,
    settings: &RescueSettings,
    zone: ZoneRef,
    instance: &str,
) -> Result<RestoreOutcome, RescueError>
where
    P: ComputeProvider,
    S: Sleeper,
    R: ProgressReporter,
{
    let mut ctx = InstanceContext::load(exec.provider(), clock, zone, instance).await?;
    RestoreWorkflow::new(exec, settings).run(&mut ctx).await
}
