//! `gce-rescue rescue`: boot an instance from a rescue disk.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::application::services::rescue::enter_rescue;
use crate::application::services::steps::StepExecutor;
use crate::cli::InstanceArgs;
use crate::domain::step::RESCUE_SEQUENCE;
use crate::infra::clock::{SystemClock, TokioSleeper};
use crate::output::{TerminalReporter, json};

/// Run the rescue command.
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
        "Stop {} ({zone}) and boot it from a rescue disk?",
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

    tracing::info!(instance = %args.instance, %zone, image = %settings.source_image, "entering rescue mode");
    match enter_rescue(&exec, &SystemClock, &settings, zone, &args.instance).await {
        Ok(outcome) => {
            if app.is_json() {
                println!("{}", json::to_pretty(&outcome)?);
            } else {
                app.renderer()
                    .render_rescue(&args.instance, &outcome, &settings.mount_point);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            reporter.abort("failed");
            app.report_failure(&e, &RESCUE_SEQUENCE)
        }
    }
}
