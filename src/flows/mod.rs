//! Flows module - Composed workflows
//!
//! Provides:
//! - launch: cache decision, refresh and execution for one invocation

pub mod launch;
