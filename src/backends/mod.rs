//! Backends module - External collaborators of the launcher
//!
//! Provides:
//! - transport: archive download and `unzip` extraction
//! - exec: handing control to the cached binary
//! - doctor: environment checking

pub mod doctor;
pub mod exec;
pub mod transport;
