//! Application service: rescue status of one instance.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use serde::Serialize;

use crate::application::ports::{Clock, ComputeProvider};
use crate::application::services::context::InstanceContext;
use crate::domain::error::RescueError;
use crate::domain::instance::{AttachedDisk, InstanceStatus, ZoneRef};
use crate::domain::session::RescueSession;

/// Read-only summary of an instance and its rescue session.
#[derive(Debug, Clone, Serialize)]
pub struct RescueStatus {
    pub instance: String,
    pub project: String,
    pub zone: String,
    pub status: InstanceStatus,
    pub rescue_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescue_disk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_disk: Option<String>,
    pub disks: Vec<AttachedDisk>,
}

/// Inspect `instance` without changing it.
///
/// # Errors
///
/// Propagates the instance lookup error.
pub async fn rescue_status(
    provider: &impl ComputeProvider,
    clock: &impl Clock,
    zone: ZoneRef,
    instance: &str,
) -> Result<RescueStatus, RescueError> {
    let ctx = InstanceContext::load(provider, clock, zone, instance).await?;
    Ok(summarize(&ctx))
}

fn summarize(ctx: &InstanceContext) -> RescueStatus {
    let active = ctx.is_rescue_active();
    // the image only feeds new rescue disks, so any value works here
    let session = active
        .then(|| RescueSession::recover(ctx.snapshot(), ctx.session_id().clone(), "").ok())
        .flatten();
    RescueStatus {
        instance: ctx.name().to_string(),
        project: ctx.zone().project.clone(),
        zone: ctx.zone().zone.clone(),
        status: ctx.status(),
        rescue_mode: active,
        session_id: active.then(|| ctx.session_id().to_string()),
        rescue_disk: session.as_ref().map(|s| s.rescue_disk_name().to_string()),
        original_disk: session.as_ref().map(|s| s.original_disk_name().to_string()),
        disks: ctx.snapshot().disks.clone(),
    }
}
