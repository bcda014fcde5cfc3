//! Entering and leaving rescue mode end to end.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use gce_rescue::application::services::rescue::enter_rescue;
use gce_rescue::application::services::restore::exit_rescue;
use gce_rescue::application::services::status::rescue_status;
use gce_rescue::application::services::steps::RescueSettings;
use gce_rescue::application::services::test_support::{
    FakeCompute, FixedClock, InstantSleeper, RecordingReporter, running_instance,
};
use gce_rescue::domain::instance::{AttachedDisk, InstanceStatus, MetadataItem};

use crate::helpers::{TS, executor, zone};

#[tokio::test]
async fn test_round_trip_restores_original_layout() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);
    let settings = RescueSettings::default();

    let rescued = enter_rescue(&exec, &FixedClock(TS), &settings, zone(), "vm")
        .await
        .expect("rescue");

    assert_eq!(rescued.session.id().as_str(), "1690000000");
    let vm = compute.instance("vm").unwrap();
    assert_eq!(
        vm.disks,
        vec![
            AttachedDisk::new(
                "linux-rescue-disk-1690000000",
                "linux-rescue-disk-1690000000",
                true
            ),
            AttachedDisk::new("linux", "linux", false),
        ]
    );
    assert_eq!(vm.metadata.get("rescue-mode"), Some("1690000000"));
    assert_eq!(vm.status, InstanceStatus::Running);
    assert_eq!(compute.snapshots(), vec!["linux-1690000000"]);

    let restored = exit_rescue(&exec, &FixedClock(TS + 600), &settings, zone(), "vm")
        .await
        .expect("restore");

    assert!(restored.cleanup.is_ok());
    assert_eq!(restored.session_id.as_str(), "1690000000");
    let vm = compute.instance("vm").unwrap();
    assert_eq!(vm.disks, vec![AttachedDisk::new("linux", "linux", true)]);
    assert!(!vm.metadata.contains("rescue-mode"));
    assert!(!vm.metadata.contains("startup-script"));
    assert_eq!(vm.status, InstanceStatus::Running);
    assert!(compute.disk("linux-rescue-disk-1690000000").is_none());
    assert!(compute.disk("linux").is_some());
}

#[tokio::test]
async fn test_round_trip_preserves_unrelated_metadata() {
    let mut instance = running_instance("vm", "linux");
    instance.metadata.items = vec![
        MetadataItem::new("ssh-keys", "alice:ssh-ed25519 AAAA"),
        MetadataItem::new("startup-script", "#!/bin/sh\necho original"),
    ];
    let compute = FakeCompute::with_instance(&zone(), instance);
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);
    let settings = RescueSettings::default();

    enter_rescue(&exec, &FixedClock(TS), &settings, zone(), "vm")
        .await
        .expect("rescue");
    let during = compute.instance("vm").unwrap().metadata;
    assert_eq!(during.get("ssh-keys"), Some("alice:ssh-ed25519 AAAA"));
    assert_ne!(during.get("startup-script"), Some("#!/bin/sh\necho original"));

    exit_rescue(&exec, &FixedClock(TS), &settings, zone(), "vm")
        .await
        .expect("restore");
    let after = compute.instance("vm").unwrap().metadata;
    assert_eq!(after.get("ssh-keys"), Some("alice:ssh-ed25519 AAAA"));
    assert_eq!(after.get("startup-script"), Some("#!/bin/sh\necho original"));
    assert!(after.items.iter().all(|i| !i.key.starts_with("rescue-mode")));
}

#[tokio::test]
async fn test_status_tracks_the_session() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);
    let settings = RescueSettings::default();

    let before = rescue_status(&compute, &FixedClock(TS), zone(), "vm").await.unwrap();
    assert!(!before.rescue_mode);
    assert!(before.session_id.is_none());

    enter_rescue(&exec, &FixedClock(TS), &settings, zone(), "vm")
        .await
        .expect("rescue");

    let during = rescue_status(&compute, &FixedClock(TS + 60), zone(), "vm").await.unwrap();
    assert!(during.rescue_mode);
    assert_eq!(during.session_id.as_deref(), Some("1690000000"));
    assert_eq!(during.rescue_disk.as_deref(), Some("linux-rescue-disk-1690000000"));
    assert_eq!(during.original_disk.as_deref(), Some("linux"));
}

#[tokio::test]
async fn test_stopped_instance_skips_stop_and_is_started_in_rescue() {
    let mut instance = running_instance("vm", "linux");
    instance.status = InstanceStatus::Terminated;
    let compute = FakeCompute::with_instance(&zone(), instance);
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);

    enter_rescue(&exec, &FixedClock(TS), &RescueSettings::default(), zone(), "vm")
        .await
        .expect("rescue");

    assert_eq!(compute.calls_to("stop_instance"), 0);
    assert_eq!(compute.calls_to("start_instance"), 1);
    assert_eq!(compute.instance("vm").unwrap().status, InstanceStatus::Running);
}

#[tokio::test]
async fn test_rescue_settles_every_progress_step() {
    let compute = FakeCompute::with_instance(&zone(), running_instance("vm", "linux"));
    let (sleeper, reporter) = (InstantSleeper::default(), RecordingReporter::default());
    let exec = executor(&compute, &sleeper, &reporter);

    enter_rescue(&exec, &FixedClock(TS), &RescueSettings::default(), zone(), "vm")
        .await
        .expect("rescue");

    let messages = reporter.messages();
    let steps = messages.iter().filter(|m| m.starts_with("step: ")).count();
    let done = messages.iter().filter(|m| m.starts_with("success: ")).count();
    assert!(steps >= 8, "got: {messages:?}");
    assert_eq!(steps, done, "every step settles: {messages:?}");
}
