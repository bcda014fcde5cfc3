//! Partial failures, conflicts and reruns.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use gce_rescue::application::services::rescue::enter_rescue;
use gce_rescue::application::services::restore::exit_rescue;
use gce_rescue::application::services::steps::RescueSettings;
use gce_rescue::application::services::test_support::{
    FakeCompute, FixedClock, InstantSleeper, RecordingReporter, running_instance,
};
use gce_rescue::domain::error::{ComputeError, ErrorKind, RescueError};
use gce_rescue::domain::instance::{AttachedDisk, Disk, InstanceStatus, OperationFailure};
use gce_rescue::domain::step::{RESCUE_SEQUENCE, Step, rerun_resumes, steps_after};

use crate::helpers::{TS, executor, zone};

#[tokio::test]
async fn test_rescue_disk_in_use_elsewhere_is_conflict() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    compute.insert_disk(Disk {
        name: "linux-rescue-disk-1690000000".to_string(),
        source_image: None,
        users: vec!["projects/rescue-test/zones/europe-west1-b/instances/other".to_string()],
    });
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);

    let err = enter_rescue(&exec, &FixedClock(TS), &RescueSettings::default(), zone(), "vm")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.failed_step(), Some(Step::CreateRescueDisk));
    assert_eq!(compute.calls_to("create_disk"), 0);
    assert_eq!(compute.calls_to("detach_disk"), 0);
}

#[tokio::test]
async fn test_failed_attach_names_step_and_last_checkpoint() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    compute.fail_operation(
        "attach_disk",
        OperationFailure::single("RESOURCE_NOT_READY", "disk is not ready"),
    );
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);

    let err = enter_rescue(&exec, &FixedClock(TS), &RescueSettings::default(), zone(), "vm")
        .await
        .unwrap_err();

    match &err {
        RescueError::StepFailed {
            step,
            last_completed,
            ..
        } => {
            assert_eq!(*step, Step::AttachRescueDiskAsBoot);
            assert_eq!(*last_completed, Some(Step::DetachOriginalBootDisk));
        }
        other => panic!("expected StepFailed, got {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::Operation);
    assert!(err.to_string().contains("disk is not ready"), "got: {err}");
    assert_eq!(
        steps_after(&RESCUE_SEQUENCE, Step::AttachRescueDiskAsBoot),
        &[
            Step::SetMetadata,
            Step::StartInstance,
            Step::AttachOriginalDiskAsSecondary
        ]
    );
    // no rollback: the original disk stays detached
    let vm = compute.instance("vm").unwrap();
    assert!(vm.disks.is_empty());
    assert_eq!(vm.status, InstanceStatus::Terminated);
}

#[tokio::test]
async fn test_stale_fingerprint_is_retried_once() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    compute.fail_next(
        "set_metadata",
        ComputeError::StaleFingerprint {
            resource: "instance vm".to_string(),
        },
    );
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);

    enter_rescue(&exec, &FixedClock(TS), &RescueSettings::default(), zone(), "vm")
        .await
        .expect("rescue");

    assert_eq!(compute.calls_to("set_metadata"), 2);
    let vm = compute.instance("vm").unwrap();
    assert_eq!(vm.metadata.get("rescue-mode"), Some("1690000000"));
}

#[tokio::test]
async fn test_second_rescue_resumes_without_recreating_disks() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);
    let settings = RescueSettings::default();

    enter_rescue(&exec, &FixedClock(TS), &settings, zone(), "vm")
        .await
        .expect("first");
    let again = enter_rescue(&exec, &FixedClock(TS + 3600), &settings, zone(), "vm")
        .await
        .expect("second");

    assert!(again.resumed);
    assert_eq!(again.session.id().as_str(), "1690000000");
    assert_eq!(compute.calls_to("create_disk"), 1);
    assert_eq!(compute.calls_to("create_snapshot"), 1);
    assert_eq!(compute.calls_to("start_instance"), 1);
    assert_eq!(compute.calls_to("attach_disk"), 2);
}

#[tokio::test]
async fn test_rerun_after_metadata_failure_refuses_to_nest_rescue_disks() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    compute.fail_operation(
        "set_metadata",
        OperationFailure::single("INTERNAL_ERROR", "metadata update failed"),
    );
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);
    let settings = RescueSettings::default();

    let first = enter_rescue(&exec, &FixedClock(TS), &settings, zone(), "vm")
        .await
        .unwrap_err();
    assert_eq!(first.failed_step(), Some(Step::SetMetadata));
    assert!(!rerun_resumes(&RESCUE_SEQUENCE, Step::SetMetadata));
    let before = compute.mutating_calls();

    let err = enter_rescue(&exec, &FixedClock(TS + 60), &settings, zone(), "vm")
        .await
        .unwrap_err();

    match &err {
        RescueError::InterruptedRescue {
            boot_disk,
            session_id,
            original_device,
            ..
        } => {
            assert_eq!(boot_disk, "linux-rescue-disk-1690000000");
            assert_eq!(session_id, "1690000000");
            assert_eq!(original_device, "linux");
        }
        other => panic!("expected InterruptedRescue, got {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(compute.mutating_calls(), before);
    assert!(compute.disk("linux-rescue-disk-1690000000-rescue-disk-1690000060").is_none());
    assert_eq!(
        compute.instance("vm").unwrap().disks,
        vec![AttachedDisk::new(
            "linux-rescue-disk-1690000000",
            "linux-rescue-disk-1690000000",
            true
        )]
    );
}

#[tokio::test]
async fn test_restore_without_rescue_changes_nothing() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);

    let err = exit_rescue(&exec, &FixedClock(TS), &RescueSettings::default(), zone(), "vm")
        .await
        .unwrap_err();

    assert!(matches!(err, RescueError::NotInRescueMode { .. }));
    assert!(compute.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_unknown_instance_is_not_found() {
    let compute = FakeCompute::default();
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);

    let err = enter_rescue(&exec, &FixedClock(TS), &RescueSettings::default(), zone(), "ghost")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(compute.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_cleanup_failure_leaves_instance_restored() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);
    let settings = RescueSettings::default();
    enter_rescue(&exec, &FixedClock(TS), &settings, zone(), "vm")
        .await
        .expect("rescue");
    compute.fail_next(
        "delete_disk",
        ComputeError::Api {
            status: 403,
            message: "permission denied".to_string(),
        },
    );

    let outcome = exit_rescue(&exec, &FixedClock(TS), &settings, zone(), "vm")
        .await
        .expect("restore still succeeds");

    let cleanup = outcome.cleanup.unwrap_err();
    assert_eq!(cleanup.kind(), ErrorKind::Cleanup);
    assert!(compute.disk("linux-rescue-disk-1690000000").is_some());
    assert_eq!(
        compute.instance("vm").unwrap().disks,
        vec![AttachedDisk::new("linux", "linux", true)]
    );
}
