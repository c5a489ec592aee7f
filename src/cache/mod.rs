//! Cache module - Manages the launcher's archive cache
//!
//! Provides:
//! - Cache index model (config.json)
//! - Cache store: index persistence and slot directories
//! - Cache policy: reuse decisions and retention
//! - Advisory results for best-effort cleanup

pub mod advisory;
pub mod entry;
pub mod policy;
pub mod store;
