//! Typed error enums for the provider boundary and the rescue workflows.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

use crate::domain::instance::OperationFailure;
use crate::domain::step::Step;

// ── Provider errors ───────────────────────────────────────────────────────────

/// Errors surfaced by a `ComputeProvider` call.
#[derive(Debug, Clone, Error)]
pub enum ComputeError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} conflicts with an existing resource: {message}")]
    Conflict { resource: String, message: String },

    #[error("metadata fingerprint for {resource} is stale")]
    StaleFingerprint { resource: String },

    #[error("transient provider failure: {message}")]
    Transient { message: String },

    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("cannot decode provider response: {message}")]
    Decode { message: String },
}

impl ComputeError {
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

// ── Error classification ──────────────────────────────────────────────────────

/// Coarse error class, used for exit codes and the JSON `code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Operation,
    StaleFingerprint,
    Transient,
    Timeout,
    Cancelled,
    InvalidState,
    Cleanup,
    Provider,
}

impl ErrorKind {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Operation => "operation_failed",
            Self::StaleFingerprint => "stale_fingerprint",
            Self::Transient => "transient",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::InvalidState => "invalid_state",
            Self::Cleanup => "cleanup_failed",
            Self::Provider => "provider_error",
        }
    }
}

// ── Workflow errors ───────────────────────────────────────────────────────────

/// Errors raised while entering or leaving rescue mode.
#[derive(Debug, Error)]
pub enum RescueError {
    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error("disk '{disk}' is already in use by {}; resolve this manually before retrying", .users.join(", "))]
    DiskInUse { disk: String, users: Vec<String> },

    #[error("operation {operation} failed: {failure}")]
    Operation {
        operation: String,
        failure: OperationFailure,
    },

    #[error("operation {operation} did not finish within {waited_secs}s")]
    Timeout { operation: String, waited_secs: u64 },

    #[error("cancelled while waiting for operation {operation}")]
    Cancelled { operation: String },

    #[error("instance '{instance}' has no boot disk")]
    MissingBootDisk { instance: String },

    #[error("instance '{instance}' is not in rescue mode; nothing to restore")]
    NotInRescueMode { instance: String },

    #[error(
        "instance '{instance}' boots from rescue disk '{boot_disk}' of interrupted session {session_id} without a rescue marker; \
         attach the original disk (device '{original_device}') as boot before retrying"
    )]
    InterruptedRescue {
        instance: String,
        boot_disk: String,
        session_id: String,
        original_device: String,
    },

    #[error("cannot determine the original boot disk of '{instance}' for session {session_id}")]
    OriginalDiskUnknown {
        instance: String,
        session_id: String,
    },

    #[error("step {step} failed (last completed: {}): {source}", .last_completed.map_or("none", Step::as_str))]
    StepFailed {
        step: Step,
        last_completed: Option<Step>,
        #[source]
        source: Box<RescueError>,
    },

    #[error("instance restored, but rescue disk '{disk}' could not be deleted: {source}")]
    CleanupFailed {
        disk: String,
        #[source]
        source: Box<RescueError>,
    },
}

impl RescueError {
    /// Wrap `source` with the step that failed and the last one that succeeded.
    #[must_use]
    pub fn step_failed(step: Step, last_completed: Option<Step>, source: RescueError) -> Self {
        Self::StepFailed {
            step,
            last_completed,
            source: Box::new(source),
        }
    }

    /// Classify the error, looking through `StepFailed` wrappers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Compute(e) => match e {
                ComputeError::NotFound { .. } => ErrorKind::NotFound,
                ComputeError::Conflict { .. } => ErrorKind::Conflict,
                ComputeError::StaleFingerprint { .. } => ErrorKind::StaleFingerprint,
                ComputeError::Transient { .. } => ErrorKind::Transient,
                ComputeError::Api { .. }
                | ComputeError::InvalidRequest { .. }
                | ComputeError::Decode { .. } => ErrorKind::Provider,
            },
            Self::DiskInUse { .. } => ErrorKind::Conflict,
            Self::Operation { .. } => ErrorKind::Operation,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::MissingBootDisk { .. } | Self::OriginalDiskUnknown { .. } => ErrorKind::NotFound,
            Self::NotInRescueMode { .. } | Self::InterruptedRescue { .. } => ErrorKind::InvalidState,
            Self::StepFailed { source, .. } => source.kind(),
            Self::CleanupFailed { .. } => ErrorKind::Cleanup,
        }
    }

    /// The step that failed, when the error came out of a workflow.
    #[must_use]
    pub fn failed_step(&self) -> Option<Step> {
        match self {
            Self::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_stale_fingerprint(&self) -> bool {
        matches!(self, Self::Compute(ComputeError::StaleFingerprint { .. }))
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },
}
