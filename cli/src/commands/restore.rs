//! `gce-rescue restore`: boot an instance from its original disk again.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::application::services::restore::{RestoreOutcome, exit_rescue};
use crate::application::services::steps::StepExecutor;
use crate::cli::InstanceArgs;
use crate::domain::step::RESTORE_SEQUENCE;
use crate::infra::clock::{SystemClock, TokioSleeper};
use crate::output::{TerminalReporter, json};

/// Run the restore command.
///
/// A rescue disk that could not be deleted is reported as a warning; the
/// command still exits 0 because the instance itself is restored.
///
/// # Errors
///
/// Returns an error if configuration, credentials or the confirmation
/// prompt fail. Workflow failures are reported and mapped to exit code 1.
pub async fn run(app: &AppContext, args: &InstanceArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let (settings, policy) = AppContext::workflow_settings(&config)?;
    let zone = args.zone_ref();

    let prompt = format!(
        "Stop {} ({zone}), restore its original boot disk and delete the rescue disk?",
        args.instance
    );
    if !app.confirm(&prompt, true)? {
        app.output.info("Aborted, nothing changed.");
        return Ok(ExitCode::SUCCESS);
    }

    let provider = app.compute(&config).await?;
    let sleeper = TokioSleeper;
    let reporter = TerminalReporter::new(&app.output);
    let exec = StepExecutor::new(&provider, &sleeper, &reporter, policy, app.cancel.clone());

    tracing::info!(instance = %args.instance, %zone, "leaving rescue mode");
    match exit_rescue(&exec, &SystemClock, &settings, zone, &args.instance).await {
        Ok(outcome) => {
            if let Err(e) = &outcome.cleanup {
                tracing::warn!(disk = %outcome.rescue_disk, error = %e, "rescue disk left behind");
            }
            if app.is_json() {
                println!("{}", json::to_pretty(&restore_json(&args.instance, &outcome))?);
            } else {
                app.renderer().render_restore(&args.instance, &outcome);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            reporter.abort("failed");
            app.report_failure(&e, &RESTORE_SEQUENCE)
        }
    }
}

fn restore_json(instance: &str, outcome: &RestoreOutcome) -> serde_json::Value {
    let cleanup = match &outcome.cleanup {
        Ok(()) => serde_json::json!({ "deleted": true }),
        Err(e) => serde_json::json!({
            "deleted": false,
            "code": e.kind().code(),
            "message": e.to_string(),
        }),
    };
    serde_json::json!({
        "instance": instance,
        "session_id": outcome.session_id,
        "rescue_disk": outcome.rescue_disk,
        "cleanup": cleanup,
    })
}
