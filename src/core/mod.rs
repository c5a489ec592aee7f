//! Core module - Shared building blocks
//!
//! This module provides:
//! - Error taxonomy for cache, config, transport and exec failures
//! - Path layout of the launcher home and project keys
//! - Rendering of command output
//! - Common utilities

pub mod error;
pub mod paths;
pub mod render;
pub mod util;
