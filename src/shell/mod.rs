//! Shell execution and process management module.
//!
//! This module handles shell subprocess creation, command execution with a
//! deadline, and output capturing.

mod subprocess;
pub use subprocess::{ProcessOutput, ShellExecutor};
