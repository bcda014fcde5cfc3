//! Building blocks shared by the rescue and restore workflows: one
//! provider call followed by a wait, plus the step checkpoint bookkeeping.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::ports::{
    AttachDiskRequest, ComputeProvider, ProgressReporter, SetMetadataRequest, Sleeper,
};
use crate::application::services::context::InstanceContext;
use crate::application::services::waiter::{OperationWaiter, PollPolicy};
use crate::domain::config::RescueConfig;
use crate::domain::error::{ComputeError, RescueError};
use crate::domain::instance::{InstanceStatus, Metadata, MetadataItem, Operation, ZoneRef};
use crate::domain::metadata::StartupScriptTemplate;
use crate::domain::step::Step;

/// Settings the workflows are constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescueSettings {
    pub source_image: String,
    pub disk_type: String,
    pub mount_point: String,
    pub template: StartupScriptTemplate,
}

impl RescueSettings {
    #[must_use]
    pub fn from_config(config: &RescueConfig, template: StartupScriptTemplate) -> Self {
        Self {
            source_image: config.rescue.selected_image().to_string(),
            disk_type: config.rescue.disk_type.clone(),
            mount_point: config.rescue.mount_point.clone(),
            template,
        }
    }
}

impl Default for RescueSettings {
    fn default() -> Self {
        Self::from_config(&RescueConfig::default(), StartupScriptTemplate::default())
    }
}

/// Record the outcome of `step`.
///
/// On success `step` becomes the last completed step. On failure the error
/// is wrapped with the failing step and the previous checkpoint.
///
/// # Errors
///
/// Returns `StepFailed` wrapping the error in `result`.
pub fn record<T>(
    step: Step,
    last_completed: &mut Option<Step>,
    result: Result<T, RescueError>,
) -> Result<T, RescueError> {
    match result {
        Ok(value) => {
            info!(step = %step, "step completed");
            *last_completed = Some(step);
            Ok(value)
        }
        Err(err) => {
            warn!(step = %step, last_completed = ?last_completed.map(Step::as_str), error = %err, "step failed");
            Err(RescueError::step_failed(step, *last_completed, err))
        }
    }
}

/// Mark `step` as completed without running it, because the instance
/// already satisfies it.
pub fn skip(step: Step, last_completed: &mut Option<Step>, reason: &str) {
    info!(step = %step, reason, "step skipped");
    *last_completed = Some(step);
}

/// Issues provider calls and blocks on their operations.
pub struct StepExecutor<'a, P, S, R> {
    provider: &'a P,
    waiter: OperationWaiter<'a, P, S>,
    reporter: &'a R,
}

impl<'a, P, S, R> StepExecutor<'a, P, S, R>
where
    P: ComputeProvider,
    S: Sleeper,
    R: ProgressReporter,
{
    #[must_use]
    pub fn new(
        provider: &'a P,
        sleeper: &'a S,
        reporter: &'a R,
        policy: PollPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            waiter: OperationWaiter::new(provider, sleeper, policy, cancel),
            reporter,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &'a P {
        self.provider
    }

    #[must_use]
    pub fn reporter(&self) -> &'a R {
        self.reporter
    }

    /// Wait for the operation a provider call returned.
    ///
    /// # Errors
    ///
    /// Propagates the call's error or the waiter's.
    pub async fn complete(
        &self,
        zone: &ZoneRef,
        issued: Result<Operation, ComputeError>,
    ) -> Result<Operation, RescueError> {
        let operation = issued?;
        debug!(operation = %operation.name, "waiting for operation");
        self.waiter.wait(zone, &operation).await
    }

    /// Stop the instance unless it is already `TERMINATED`.
    ///
    /// # Errors
    ///
    /// Propagates provider and waiter errors.
    pub async fn stop_instance(&self, ctx: &mut InstanceContext) -> Result<(), RescueError> {
        if ctx.status() == InstanceStatus::Terminated {
            debug!(instance = ctx.name(), "already stopped");
            return Ok(());
        }
        self.reporter.step(&format!("Stopping instance {}", ctx.name()));
        let issued = self.provider.stop_instance(ctx.zone(), ctx.name()).await;
        self.complete(ctx.zone(), issued).await?;
        ctx.set_status(InstanceStatus::Terminated);
        self.reporter.success("Instance stopped");
        Ok(())
    }

    /// Start the instance unless it is already `RUNNING`.
    ///
    /// # Errors
    ///
    /// Propagates provider and waiter errors.
    pub async fn start_instance(&self, ctx: &mut InstanceContext) -> Result<(), RescueError> {
        if ctx.status() == InstanceStatus::Running {
            debug!(instance = ctx.name(), "already running");
            return Ok(());
        }
        self.reporter.step(&format!("Starting instance {}", ctx.name()));
        let issued = self.provider.start_instance(ctx.zone(), ctx.name()).await;
        self.complete(ctx.zone(), issued).await?;
        ctx.set_status(InstanceStatus::Running);
        self.reporter.success("Instance started");
        Ok(())
    }

    /// Attach `disk` under `device_name`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for malformed names, otherwise propagates
    /// provider and waiter errors.
    pub async fn attach_disk(
        &self,
        ctx: &InstanceContext,
        disk: &str,
        device_name: &str,
        boot: bool,
    ) -> Result<(), RescueError> {
        let req = AttachDiskRequest {
            disk_name: disk,
            device_name,
            boot,
        };
        req.validate()?;
        let role = if boot { "boot" } else { "secondary" };
        self.reporter
            .step(&format!("Attaching disk {disk} as {role} device"));
        let issued = self.provider.attach_disk(ctx.zone(), ctx.name(), &req).await;
        self.complete(ctx.zone(), issued).await?;
        self.reporter.success(&format!("Disk {disk} attached"));
        Ok(())
    }

    /// Detach the disk attached under `device_name`.
    ///
    /// # Errors
    ///
    /// Propagates provider and waiter errors.
    pub async fn detach_disk(&self, ctx: &InstanceContext, device_name: &str) -> Result<(), RescueError> {
        self.reporter.step(&format!("Detaching device {device_name}"));
        let issued = self
            .provider
            .detach_disk(ctx.zone(), ctx.name(), device_name)
            .await;
        self.complete(ctx.zone(), issued).await?;
        self.reporter.success(&format!("Device {device_name} detached"));
        Ok(())
    }

    /// Replace the instance metadata with `build(current)`.
    ///
    /// The fingerprint cached in `ctx` is used first. If the provider
    /// rejects it as stale the instance is re-read and the write retried
    /// once against the fresh metadata.
    ///
    /// # Errors
    ///
    /// Propagates provider and waiter errors, including a second stale
    /// fingerprint.
    pub async fn write_metadata(
        &self,
        ctx: &InstanceContext,
        build: impl Fn(&Metadata) -> Vec<MetadataItem>,
    ) -> Result<(), RescueError> {
        self.reporter
            .step(&format!("Updating metadata of {}", ctx.name()));
        let cached = ctx.metadata();
        match self.set_metadata(ctx, &cached.fingerprint, &build(cached)).await {
            Err(err) if err.is_stale_fingerprint() => {
                warn!(instance = ctx.name(), "metadata fingerprint is stale; re-reading instance");
                let fresh = self.provider.get_instance(ctx.zone(), ctx.name()).await?;
                let items = build(&fresh.metadata);
                self.set_metadata(ctx, &fresh.metadata.fingerprint, &items)
                    .await?;
            }
            other => other?,
        }
        self.reporter.success("Metadata updated");
        Ok(())
    }

    async fn set_metadata(
        &self,
        ctx: &InstanceContext,
        fingerprint: &str,
        items: &[MetadataItem],
    ) -> Result<(), RescueError> {
        let req = SetMetadataRequest { fingerprint, items };
        req.validate()?;
        let issued = self
            .provider
            .set_metadata(ctx.zone(), ctx.name(), &req)
            .await;
        self.complete(ctx.zone(), issued).await?;
        Ok(())
    }
}
