//! Unit tests for gce-rescue
//!
//! Workflow scenarios driven through the public library API against the
//! in-memory Compute Engine double. No network, no real sleeping.

mod architecture;
mod failure_paths;
mod helpers;
mod operation_waiter;
mod round_trip;
