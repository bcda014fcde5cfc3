//! `rescue`, `restore` and `status` failure paths that never touch Compute
//! Engine.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gce_rescue(config: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gce-rescue"));
    cmd.env("NO_COLOR", "1")
        .env("GCE_RESCUE_CONFIG", config)
        .env("GCE_RESCUE_ACCESS_TOKEN", "test-token")
        .env("GCE_RESCUE_PROJECT", "proj")
        .env("GCE_RESCUE_ZONE", "us-central1-a")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_rescue_with_missing_template_fails_before_any_api_call() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "rescue:\n  startup_script: /nonexistent/rescue-template.sh\n",
    );
    gce_rescue(&config)
        .args(["rescue", "--yes", "--instance", "vm"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("startup script template"));
}

#[test]
fn test_rescue_template_without_placeholder_json_error() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("rescue.sh");
    std::fs::write(&template, "echo no disk here\n").unwrap();
    let config = write_config(
        &dir,
        &format!("rescue:\n  startup_script: {}\n", template.display()),
    );
    let output = gce_rescue(&config)
        .args(["--json", "rescue", "--yes", "--instance", "vm"])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(v["error"], true);
    assert!(
        v["message"].as_str().unwrap().contains("GOOGLE_DISK_NAME"),
        "got: {v}"
    );
}

#[test]
fn test_status_against_unreachable_endpoint_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "api:\n  endpoint: http://127.0.0.1:9\n  request_timeout_secs: 2\n  max_retries: 0\n",
    );
    gce_rescue(&config)
        .args(["status", "--instance", "vm"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}
