//! Shared fixtures for the scenario tests.

use gce_rescue::application::services::steps::StepExecutor;
use gce_rescue::application::services::test_support::{
    FakeCompute, InstantSleeper, RecordingReporter,
};
use gce_rescue::application::services::waiter::PollPolicy;
use gce_rescue::domain::instance::ZoneRef;
use tokio_util::sync::CancellationToken;

pub const TS: i64 = 1_690_000_000;

pub fn zone() -> ZoneRef {
    ZoneRef::new("rescue-test", "europe-west1-b")
}

pub fn executor<'a>(
    compute: &'a FakeCompute,
    sleeper: &'a InstantSleeper,
    reporter: &'a RecordingReporter,
) -> StepExecutor<'a, FakeCompute, InstantSleeper, RecordingReporter> {
    StepExecutor::new(
        compute,
        sleeper,
        reporter,
        PollPolicy::default(),
        CancellationToken::new(),
    )
}
