//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod instance;
pub mod metadata;
pub mod session;
pub mod step;

pub use config::{RescueConfig, apply_config_value, validate_config_key, validate_config_value};
pub use error::{ComputeError, ConfigError, ErrorKind, RescueError};
pub use instance::{
    AttachedDisk, Disk, Instance, InstanceStatus, Metadata, MetadataItem, Operation,
    OperationFailure, OperationStatus, ZoneRef,
};
pub use metadata::StartupScriptTemplate;
pub use session::{ModeDetection, RescueSession, SessionId, detect_mode};
pub use step::Step;
