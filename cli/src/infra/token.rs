//! OAuth access token for the Compute Engine API.
//!
//! `$GCE_RESCUE_ACCESS_TOKEN` wins; otherwise the active `gcloud` account
//! is asked for one.

use anyhow::{Context, Result};

use crate::application::ports::CommandRunner;

pub const TOKEN_ENV: &str = "GCE_RESCUE_ACCESS_TOKEN";

/// Resolve an access token.
///
/// # Errors
///
/// Returns an error if `gcloud` cannot be run, exits non-zero, or prints
/// an empty token.
pub async fn access_token(runner: &impl CommandRunner) -> Result<String> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        let token = token.trim();
        if !token.is_empty() {
            tracing::debug!("using access token from {TOKEN_ENV}");
            return Ok(token.to_string());
        }
    }

    let output = runner
        .run("gcloud", &["auth", "print-access-token"])
        .await
        .context("running gcloud auth print-access-token (install the Google Cloud SDK or set GCE_RESCUE_ACCESS_TOKEN)")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "gcloud auth print-access-token failed: {}\n\nRun 'gcloud auth login' or set {TOKEN_ENV}.",
            stderr.trim()
        );
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    anyhow::ensure!(!token.is_empty(), "gcloud printed an empty access token");
    Ok(token)
}
