//! Application context: unified state passed to every command handler.
//!
//! `AppContext` carries the output context, the config store, the
//! cancellation token and the interactivity decision. Compute Engine
//! access is built on demand so that `config` and `version` never need
//! credentials.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::application::services::steps::RescueSettings;
use crate::application::services::waiter::PollPolicy;
use crate::domain::config::RescueConfig;
use crate::domain::error::RescueError;
use crate::domain::step::Step;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::{YamlConfigStore, load_startup_template};
use crate::infra::gce::GceComputeProvider;
use crate::infra::token::access_token;
use crate::output::{HumanRenderer, OutputContext, json};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `GCE_RESCUE_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    ///
    /// Progress output is silenced in JSON mode so stdout carries exactly
    /// one JSON document.
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// YAML-backed configuration store.
    pub config_store: YamlConfigStore,
    /// Cancelled on Ctrl-C; observed by operation waits.
    pub cancel: CancellationToken,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or
    /// `GCE_RESCUE_YES` environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: &AppFlags, cancel: CancellationToken) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("GCE_RESCUE_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Self {
            output: OutputContext::new(
                flags.output.no_color,
                flags.output.quiet || flags.output.json,
            ),
            mode,
            config_store: YamlConfigStore,
            cancel,
            non_interactive,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Human renderer over this context's output settings.
    #[must_use]
    pub fn renderer(&self) -> HumanRenderer<'_> {
        HumanRenderer::new(&self.output)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `GCE_RESCUE_YES`
    /// env), returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("confirmation prompt failed (pass --yes to skip it)")?;
        Ok(confirmed)
    }

    /// Authenticated Compute Engine client built from `config.api`.
    ///
    /// # Errors
    ///
    /// Returns an error if no access token can be obtained or the HTTP
    /// client cannot be built.
    pub async fn compute(&self, config: &RescueConfig) -> Result<GceComputeProvider> {
        let runner = TokioCommandRunner::default();
        let token = access_token(&runner).await?;
        GceComputeProvider::new(&config.api, token)
    }

    /// Rescue settings and poll policy for the workflow commands.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured startup-script template is unusable.
    pub fn workflow_settings(config: &RescueConfig) -> Result<(RescueSettings, PollPolicy)> {
        let template = load_startup_template(config)?;
        Ok((
            RescueSettings::from_config(config, template),
            PollPolicy::from_config(&config.poll),
        ))
    }

    /// Report a workflow failure in the active output mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON error object cannot be serialized.
    pub fn report_failure(&self, err: &RescueError, sequence: &[Step]) -> Result<ExitCode> {
        tracing::debug!(error = %err, kind = err.kind().code(), "workflow failed");
        if self.is_json() {
            println!("{}", json::format_workflow_error(err, sequence)?);
        } else {
            self.renderer().render_workflow_error(err, sequence);
        }
        Ok(ExitCode::FAILURE)
    }
}
