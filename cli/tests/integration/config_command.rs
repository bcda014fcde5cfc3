//! Integration tests for `gce-rescue config`.
//!
//! All filesystem-touching tests set `GCE_RESCUE_CONFIG` to a temp path so
//! they never read or write `~/.gce-rescue/config.yaml`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gce_rescue() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gce-rescue"));
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Returns a `TempDir` and the path string for a config file inside it.
fn temp_config_path() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir
        .path()
        .join("config.yaml")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}

#[test]
fn test_config_help_shows_subcommands() {
    gce_rescue()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("path"));
}

#[test]
fn test_config_path_honours_env_override() {
    let (_dir, path) = temp_config_path();
    gce_rescue()
        .args(["config", "path"])
        .env("GCE_RESCUE_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains(path.as_str()));
}

#[test]
fn test_config_show_without_file_prints_defaults() {
    let (_dir, path) = temp_config_path();
    gce_rescue()
        .args(["config", "show"])
        .env("GCE_RESCUE_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("pd-balanced"))
        .stdout(predicate::str::contains("/mnt/sysroot"));
}

#[test]
fn test_config_show_json_is_valid() {
    let (_dir, path) = temp_config_path();
    let output = gce_rescue()
        .args(["config", "show", "--json"])
        .env("GCE_RESCUE_CONFIG", &path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(v["poll"]["timeout_secs"], 1800);
    assert_eq!(v["rescue"]["disk_type"], "pd-balanced");
}

#[test]
fn test_config_set_persists_value() {
    let (_dir, path) = temp_config_path();
    gce_rescue()
        .args(["config", "set", "poll.timeout_secs", "600"])
        .env("GCE_RESCUE_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Set poll.timeout_secs = 600"));

    let content = std::fs::read_to_string(&path).expect("config written");
    assert!(content.contains("timeout_secs: 600"), "got: {content}");
}

#[test]
fn test_config_set_unknown_key_fails_without_writing() {
    let (_dir, path) = temp_config_path();
    gce_rescue()
        .args(["config", "set", "rescue.colour", "blue"])
        .env("GCE_RESCUE_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting: rescue.colour"));
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_set_invalid_value_fails() {
    let (_dir, path) = temp_config_path();
    gce_rescue()
        .args(["config", "set", "poll.initial_interval_secs", "0"])
        .env("GCE_RESCUE_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("positive integer"));
}

#[test]
fn test_config_set_unknown_key_json_error_object() {
    let (_dir, path) = temp_config_path();
    let output = gce_rescue()
        .args(["--json", "config", "set", "nope", "1"])
        .env("GCE_RESCUE_CONFIG", &path)
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(v["error"], true);
    assert!(v["message"].as_str().unwrap().contains("Unknown setting"));
}
