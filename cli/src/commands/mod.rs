//! Command implementations

pub mod config;
pub mod rescue;
pub mod restore;
pub mod status;
pub mod version;
