//! gce-rescue - boot a broken Compute Engine VM from a rescue disk

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use gce_rescue::cli::Cli;
use gce_rescue::domain::error::RescueError;
use gce_rescue::output::json;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping after the current request");
                cancel.cancel();
            }
        }
    });

    let json_mode = cli.json;
    match cli.run(cancel).await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            if json_mode {
                let code = e
                    .downcast_ref::<RescueError>()
                    .map_or("error", |r| r.kind().code());
                match json::format_error(&message, code) {
                    Ok(out) => println!("{out}"),
                    Err(_) => eprintln!("Error: {message}"),
                }
            } else {
                eprintln!("Error: {message}");
            }
            ExitCode::FAILURE
        }
    }
}
