//! `gce-rescue status`: show whether an instance is in rescue mode.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::application::services::status::rescue_status;
use crate::cli::InstanceArgs;
use crate::infra::clock::SystemClock;
use crate::output::json;

/// Run the status command.
///
/// # Errors
///
/// Returns an error if configuration or credentials fail, or the instance
/// cannot be read.
pub async fn run(app: &AppContext, args: &InstanceArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let provider = app.compute(&config).await?;

    let status = rescue_status(&provider, &SystemClock, args.zone_ref(), &args.instance).await?;

    if app.is_json() {
        println!("{}", json::to_pretty(&status)?);
    } else {
        app.renderer().render_status(&status);
    }
    Ok(ExitCode::SUCCESS)
}
