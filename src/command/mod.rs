//! Command execution infrastructure for the device
//!
//! This module handles:
//! - Tracking the single active command execution
//! - Publishing progress and final responses for it
//! - Routing inbound messages from the connection to the executor

mod executor;
pub mod listener;

pub use executor::{CommandExecutor, Execution, ExecutorError, Report, Snapshot};
