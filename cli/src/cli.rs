//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;
use crate::domain::instance::ZoneRef;

/// Boot a broken Compute Engine VM from a rescue disk, then put it back
#[derive(Parser)]
#[command(
    name = "gce-rescue",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Identifies the instance a command operates on.
#[derive(Args, Debug, Clone)]
pub struct InstanceArgs {
    /// Project that owns the instance
    #[arg(long, env = "GCE_RESCUE_PROJECT")]
    pub project: String,

    /// Zone the instance lives in
    #[arg(long, env = "GCE_RESCUE_ZONE")]
    pub zone: String,

    /// Instance name
    #[arg(long)]
    pub instance: String,
}

impl InstanceArgs {
    #[must_use]
    pub fn zone_ref(&self) -> ZoneRef {
        ZoneRef::new(&self.project, &self.zone)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Boot the instance from a fresh rescue disk with its boot disk attached
    Rescue(InstanceArgs),

    /// Put the original boot disk back and delete the rescue disk
    Restore(InstanceArgs),

    /// Show whether the instance is in rescue mode
    Status(InstanceArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails before producing a result.
    pub async fn run(self, cancel: CancellationToken) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            log_level: _,
            command,
        } = self;
        let app = AppContext::new(
            &AppFlags {
                output: OutputFlags {
                    no_color,
                    quiet,
                    json,
                },
                behaviour: BehaviourFlags { yes },
            },
            cancel,
        );
        match command {
            Command::Rescue(args) => commands::rescue::run(&app, &args).await,
            Command::Restore(args) => commands::restore::run(&app, &args).await,
            Command::Status(args) => commands::status::run(&app, &args).await,
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}
