//! Long-running operations seen from inside a workflow.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use gce_rescue::application::services::rescue::enter_rescue;
use gce_rescue::application::services::steps::{RescueSettings, StepExecutor};
use gce_rescue::application::services::test_support::{
    FakeCompute, FixedClock, InstantSleeper, RecordingReporter, running_instance,
};
use gce_rescue::application::services::waiter::PollPolicy;
use gce_rescue::domain::error::ErrorKind;
use gce_rescue::domain::instance::{Operation, OperationStatus};
use gce_rescue::domain::step::Step;
use tokio_util::sync::CancellationToken;

use crate::helpers::{TS, executor, zone};

fn polled(status: OperationStatus) -> Operation {
    Operation {
        name: "operation-1".to_string(),
        status,
        error: None,
    }
}

#[tokio::test]
async fn test_slow_stop_is_polled_with_backoff() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    compute.script_operation(vec![
        polled(OperationStatus::Pending),
        polled(OperationStatus::Running),
    ]);
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);

    enter_rescue(&exec, &FixedClock(TS), &RescueSettings::default(), zone(), "vm")
        .await
        .expect("rescue");

    assert_eq!(
        sleeper.sleeps(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn test_operation_that_never_finishes_times_out_inside_step() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    compute.script_operation(vec![polled(OperationStatus::Running); 10]);
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let policy = PollPolicy::fixed(Duration::from_secs(1)).with_timeout(Some(Duration::from_secs(3)));
    let exec = StepExecutor::new(&compute, &sleeper, &reporter, policy, CancellationToken::new());

    let err = enter_rescue(&exec, &FixedClock(TS), &RescueSettings::default(), zone(), "vm")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.failed_step(), Some(Step::StopInstance));
    assert_eq!(compute.mutating_calls(), vec!["stop_instance vm"]);
}

#[tokio::test]
async fn test_ctrl_c_during_wait_cancels_workflow() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    compute.script_operation(vec![polled(OperationStatus::Running); 3]);
    let cancel = CancellationToken::new();
    let sleeper = InstantSleeper::cancelling(cancel.clone());
    let reporter = RecordingReporter::default();
    let exec = StepExecutor::new(&compute, &sleeper, &reporter, PollPolicy::default(), cancel);

    let err = enter_rescue(&exec, &FixedClock(TS), &RescueSettings::default(), zone(), "vm")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.failed_step(), Some(Step::StopInstance));
    assert_eq!(compute.calls_to("create_snapshot"), 0);
}
