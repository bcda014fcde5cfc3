//! Human-readable terminal renderer.

use std::path::Path;

use owo_colors::OwoColorize as _;

use crate::application::services::rescue::RescueOutcome;
use crate::application::services::restore::RestoreOutcome;
use crate::application::services::status::RescueStatus;
use crate::domain::config::RescueConfig;
use crate::domain::error::RescueError;
use crate::domain::instance::{AttachedDisk, InstanceStatus};
use crate::domain::step::{RESCUE_SEQUENCE, Step, rerun_resumes, steps_after};
use crate::output::OutputContext;

/// Renders workflow results as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.info(&format!("gce-rescue v{version}"));
    }

    /// Render the rescue-mode state of one instance.
    pub fn render_status(&self, status: &RescueStatus) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.kv("Instance:", &status.instance);
        self.ctx
            .kv("Zone:", &format!("{}/{}", status.project, status.zone));
        self.ctx.kv("Status:", instance_status_display(status.status));
        println!();
        if status.rescue_mode {
            self.ctx.warn(&format!(
                "Rescue mode active (session {})",
                status.session_id.as_deref().unwrap_or("unknown")
            ));
            if let Some(disk) = &status.rescue_disk {
                self.ctx.kv("Rescue disk:", disk);
            }
            if let Some(disk) = &status.original_disk {
                self.ctx.kv("Original disk:", disk);
            }
        } else {
            self.ctx.success("Not in rescue mode");
        }
        println!();
        self.ctx.header("Disks:");
        for disk in &status.disks {
            let style = if disk.boot {
                self.ctx.styles.boot
            } else {
                self.ctx.styles.dim
            };
            println!("    {}", disk_line(disk).style(style));
        }
        println!();
    }

    /// Render a completed (or resumed) rescue.
    pub fn render_rescue(&self, instance: &str, outcome: &RescueOutcome, mount_point: &str) {
        if self.ctx.quiet {
            return;
        }
        let session = &outcome.session;
        println!();
        if outcome.resumed {
            self.ctx.success(&format!(
                "Resumed rescue session {} on {instance}",
                session.id()
            ));
        } else {
            self.ctx
                .success(&format!("{instance} is now in rescue mode"));
        }
        self.ctx.kv("Session:", session.id().as_str());
        self.ctx.kv("Rescue disk:", session.rescue_disk_name());
        self.ctx.kv("Backup:", &session.snapshot_name());
        self.ctx.kv("Original disk:", session.original_disk_name());
        println!();
        self.ctx.info(&format!(
            "The original boot disk is mounted at {mount_point} once the guest boots."
        ));
        self.ctx
            .info(&format!("Run: gce-rescue restore --instance {instance}"));
        println!();
    }

    /// Render a completed restore. Cleanup failures are warnings, not errors.
    pub fn render_restore(&self, instance: &str, outcome: &RestoreOutcome) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx
            .success(&format!("{instance} booted from its original disk"));
        match &outcome.cleanup {
            Ok(()) => self
                .ctx
                .kv("Deleted:", &outcome.rescue_disk),
            Err(e) => {
                self.ctx.warn(&format!("{e}"));
                self.ctx.info(&format!(
                    "Delete it manually: gcloud compute disks delete {}",
                    outcome.rescue_disk
                ));
            }
        }
        println!();
    }

    /// Render a workflow failure with the steps that never ran and whether
    /// a rerun can pick up from here.
    pub fn render_workflow_error(&self, err: &RescueError, sequence: &[Step]) {
        self.ctx.error(&format!("{err}"));
        let Some(step) = err.failed_step() else {
            return;
        };
        let remaining = steps_after(sequence, step);
        if !remaining.is_empty() {
            eprintln!("    {}", "Not executed:".style(self.ctx.styles.dim));
            for s in remaining {
                eprintln!("      {}", s.style(self.ctx.styles.dim));
            }
        }
        eprintln!("    {}", rerun_advice(sequence, step).style(self.ctx.styles.dim));
    }

    /// Render the current configuration.
    pub fn render_config(&self, config: &RescueConfig, path: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        println!("  {:<28} {}", "rescue.image:", config.rescue.selected_image());
        println!("  {:<28} {}", "rescue.disk_type:", config.rescue.disk_type);
        println!("  {:<28} {}", "rescue.mount_point:", config.rescue.mount_point);
        println!(
            "  {:<28} {}",
            "rescue.startup_script:",
            config
                .rescue
                .startup_script
                .as_ref()
                .map_or_else(|| "(embedded)".to_string(), |p| p.display().to_string())
        );
        println!(
            "  {:<28} {}",
            "poll.initial_interval_secs:", config.poll.initial_interval_secs
        );
        println!("  {:<28} {}", "poll.max_interval_secs:", config.poll.max_interval_secs);
        println!("  {:<28} {}", "poll.multiplier:", config.poll.multiplier);
        println!("  {:<28} {}", "poll.timeout_secs:", config.poll.timeout_secs);
        println!("  {:<28} {}", "api.endpoint:", config.api.endpoint);
        println!(
            "  {:<28} {}",
            "api.request_timeout_secs:", config.api.request_timeout_secs
        );
        println!("  {:<28} {}", "api.max_retries:", config.api.max_retries);
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["GCE_RESCUE_CONFIG", "GCE_RESCUE_ACCESS_TOKEN", "NO_COLOR"] {
            let value = match std::env::var(var) {
                Ok(_) if var == "GCE_RESCUE_ACCESS_TOKEN" => "(set)".to_string(),
                Ok(v) => v,
                Err(_) => "(not set)".to_string(),
            };
            println!("    {:<26} {value}", format!("{var}:"));
        }
        println!();
    }
}

// ── Display helpers ──────────────────────────────────────────────────────────

#[must_use]
pub fn instance_status_display(status: InstanceStatus) -> &'static str {
    match status {
        InstanceStatus::Running => "running",
        InstanceStatus::Terminated => "stopped",
        InstanceStatus::Unknown => "transitioning",
    }
}

/// What the operator should do after `failed` stopped a workflow.
#[must_use]
pub fn rerun_advice(sequence: &[Step], failed: Step) -> &'static str {
    if rerun_resumes(sequence, failed) {
        "Re-running the same command resumes from the current instance state."
    } else if sequence == RESCUE_SEQUENCE.as_slice() {
        "Attach the original disk as boot again before re-running; a rerun refuses while the rescue disk boots the instance."
    } else {
        "The original disk is back in place and the rescue marker is cleared; start the instance manually."
    }
}

#[must_use]
pub fn disk_line(disk: &AttachedDisk) -> String {
    let role = if disk.boot { "boot" } else { "data" };
    format!("{:<32} {:<24} {role}", disk.name, disk.device_name)
}
