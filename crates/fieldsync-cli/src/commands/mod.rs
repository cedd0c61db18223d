//! CLI command implementations

pub mod download;
pub mod pending;
pub mod status;
pub mod sync;
