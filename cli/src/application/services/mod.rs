//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod config_service;
pub mod context;
pub mod rescue;
pub mod restore;
pub mod status;
pub mod steps;
#[doc(hidden)]
pub mod test_support;
pub mod waiter;
