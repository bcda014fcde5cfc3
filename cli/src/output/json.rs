//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one pretty-printed object on
//! stdout: either the command result or the error object below.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::error::RescueError;
use crate::domain::step::Step;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format a workflow failure, naming the failed step, the steps that
/// never ran and whether re-running resumes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_workflow_error(err: &RescueError, sequence: &[Step]) -> Result<String> {
    let mut obj = serde_json::json!({
        "error": true,
        "message": format!("{err}"),
        "code": err.kind().code(),
    });
    if let Some(step) = err.failed_step() {
        obj["failed_step"] = serde_json::json!(step);
        obj["remaining_steps"] =
            serde_json::json!(crate::domain::step::steps_after(sequence, step));
        obj["resumable"] = serde_json::json!(crate::domain::step::rerun_resumes(sequence, step));
    }
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Pretty-print any serializable command result.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn to_pretty(value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}
