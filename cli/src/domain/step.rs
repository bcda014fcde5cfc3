//! Named workflow steps, used for progress messages and failure reports.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    StopInstance,
    BackupOriginalDisk,
    CreateRescueDisk,
    DetachOriginalBootDisk,
    AttachRescueDiskAsBoot,
    SetMetadata,
    StartInstance,
    AttachOriginalDiskAsSecondary,
    DetachRescueBootDisk,
    DetachOriginalSecondaryDisk,
    AttachOriginalDiskAsBoot,
    ResetMetadata,
    DeleteRescueDisk,
}

/// Order in which rescue mode is entered.
pub const RESCUE_SEQUENCE: [Step; 8] = [
    Step::StopInstance,
    Step::BackupOriginalDisk,
    Step::CreateRescueDisk,
    Step::DetachOriginalBootDisk,
    Step::AttachRescueDiskAsBoot,
    Step::SetMetadata,
    Step::StartInstance,
    Step::AttachOriginalDiskAsSecondary,
];

/// Order in which rescue mode is exited.
pub const RESTORE_SEQUENCE: [Step; 7] = [
    Step::StopInstance,
    Step::DetachRescueBootDisk,
    Step::DetachOriginalSecondaryDisk,
    Step::AttachOriginalDiskAsBoot,
    Step::ResetMetadata,
    Step::StartInstance,
    Step::DeleteRescueDisk,
];

impl Step {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopInstance => "stop-instance",
            Self::BackupOriginalDisk => "backup-original-disk",
            Self::CreateRescueDisk => "create-rescue-disk",
            Self::DetachOriginalBootDisk => "detach-original-boot-disk",
            Self::AttachRescueDiskAsBoot => "attach-rescue-disk-as-boot",
            Self::SetMetadata => "set-metadata",
            Self::StartInstance => "start-instance",
            Self::AttachOriginalDiskAsSecondary => "attach-original-disk-as-secondary",
            Self::DetachRescueBootDisk => "detach-rescue-boot-disk",
            Self::DetachOriginalSecondaryDisk => "detach-original-secondary-disk",
            Self::AttachOriginalDiskAsBoot => "attach-original-disk-as-boot",
            Self::ResetMetadata => "reset-metadata",
            Self::DeleteRescueDisk => "delete-rescue-disk",
        }
    }
}

/// Steps of `sequence` that follow `failed`, i.e. the ones that never ran.
#[must_use]
pub fn steps_after(sequence: &[Step], failed: Step) -> &[Step] {
    match sequence.iter().position(|s| *s == failed) {
        Some(i) => &sequence[i + 1..],
        None => &[],
    }
}

/// Whether re-running the workflow after `failed` picks up from the
/// instance's current state.
///
/// A rescue that stops between detaching the original boot disk and
/// writing the rescue marker leaves no record of the original disk, so a
/// rerun refuses. A restore that fails after clearing the marker is no
/// longer seen as a rescue.
#[must_use]
pub fn rerun_resumes(sequence: &[Step], failed: Step) -> bool {
    if sequence == RESCUE_SEQUENCE.as_slice() {
        !matches!(
            failed,
            Step::DetachOriginalBootDisk | Step::AttachRescueDiskAsBoot | Step::SetMetadata
        )
    } else {
        !matches!(failed, Step::StartInstance | Step::DeleteRescueDisk)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
