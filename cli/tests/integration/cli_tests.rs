//! CLI structure and argument parsing.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn gce_rescue() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gce-rescue"));
    cmd.env("NO_COLOR", "1")
        .env_remove("GCE_RESCUE_PROJECT")
        .env_remove("GCE_RESCUE_ZONE");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    gce_rescue()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("rescue disk"));
}

#[test]
fn test_cli_help_lists_commands() {
    gce_rescue()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("rescue"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    gce_rescue()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gce-rescue"));
}

#[test]
fn test_version_command_shows_version() {
    gce_rescue()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!(
            "gce-rescue ",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = gce_rescue()
        .args(["version", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(v["version"], env!("CARGO_PKG_VERSION"));
}

// --- Instance arguments ---

#[test]
fn test_restore_without_instance_args_fails() {
    gce_rescue()
        .arg("restore")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--project"));
}

#[test]
fn test_rescue_help_documents_env_fallbacks() {
    gce_rescue()
        .args(["rescue", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GCE_RESCUE_PROJECT"))
        .stdout(predicate::str::contains("GCE_RESCUE_ZONE"))
        .stdout(predicate::str::contains("--instance"));
}

#[test]
fn test_unknown_subcommand_fails() {
    gce_rescue().arg("reboot").assert().code(2);
}
