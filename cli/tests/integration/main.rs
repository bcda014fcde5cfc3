//! Integration tests for the gce-rescue CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior.
//! None of them reach Compute Engine: every workflow test fails before the
//! first API call or points the client at a closed local port.

mod cli_tests;
mod config_command;
mod workflow_commands;
