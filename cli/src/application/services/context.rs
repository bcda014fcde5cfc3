//! In-memory view of the instance a workflow operates on.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use tracing::info;

use crate::application::ports::{Clock, ComputeProvider};
use crate::domain::error::RescueError;
use crate::domain::instance::{Instance, InstanceStatus, Metadata, ZoneRef};
use crate::domain::session::{SessionId, detect_mode};

/// One target instance: its coordinates, the snapshot fetched at
/// construction, the cached status and the resolved session id.
///
/// The cached status is the only thing that changes after construction,
/// and only once a start or stop operation is confirmed done.
#[derive(Debug, Clone)]
pub struct InstanceContext {
    zone: ZoneRef,
    snapshot: Instance,
    status: InstanceStatus,
    rescue_active: bool,
    session_id: SessionId,
}

impl InstanceContext {
    /// Fetch `instance` and detect whether rescue mode is active.
    ///
    /// # Errors
    ///
    /// Returns `Compute(NotFound)` if the instance does not exist, or any
    /// other provider error from the lookup.
    pub async fn load(
        provider: &impl ComputeProvider,
        clock: &impl Clock,
        zone: ZoneRef,
        instance: &str,
    ) -> Result<Self, RescueError> {
        let snapshot = provider.get_instance(&zone, instance).await?;
        Ok(Self::from_instance(zone, snapshot, clock))
    }

    /// Build a context from an instance already in hand.
    #[must_use]
    pub fn from_instance(zone: ZoneRef, snapshot: Instance, clock: &impl Clock) -> Self {
        let mode = detect_mode(&snapshot.metadata, || SessionId::from_unix(clock.now_unix()));
        info!(
            instance = %snapshot.name,
            zone = %zone,
            status = %snapshot.status,
            rescue_active = mode.active,
            session = %mode.session_id,
            "loaded instance"
        );
        Self {
            zone,
            status: snapshot.status,
            snapshot,
            rescue_active: mode.active,
            session_id: mode.session_id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    #[must_use]
    pub fn zone(&self) -> &ZoneRef {
        &self.zone
    }

    #[must_use]
    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    /// Record a status confirmed by a finished operation.
    pub fn set_status(&mut self, status: InstanceStatus) {
        self.status = status;
    }

    #[must_use]
    pub fn is_rescue_active(&self) -> bool {
        self.rescue_active
    }

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The instance as fetched at construction. Disk layout and metadata
    /// are not refreshed as workflows mutate the instance.
    #[must_use]
    pub fn snapshot(&self) -> &Instance {
        &self.snapshot
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.snapshot.metadata
    }
}
