//! Error type for the run pipeline.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::security::RiskLevel;

/// Everything that can stop a command from producing a [`CommandResult`].
///
/// A command that runs and exits non-zero is not an error here; it comes back
/// as a normal result with `succeeded() == false`. Only
/// [`Runner::run_output`] turns it into [`RunError::ExecutionFailed`].
///
/// [`CommandResult`]: crate::runner::CommandResult
/// [`Runner::run_output`]: crate::runner::Runner::run_output
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Matched a critical pattern. Never executed.
    #[error("Command blocked: {reason}")]
    Blocked { reason: String },

    /// Allowed by the classifier but above the configured ceiling.
    #[error("Command risk level {level} exceeds the configured maximum of {max}")]
    RiskExceeded { level: RiskLevel, max: RiskLevel },

    /// Did not exit before the deadline; termination was requested.
    #[error("Command timed out after {}s: {command}", .timeout.as_secs_f64())]
    Timeout { command: String, timeout: Duration },

    #[error("Failed to spawn shell {}: {source}", .shell.display())]
    SpawnFailed {
        shell: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Non-zero exit, raised only by the output-only accessor.
    #[error("Command exited with status {exit_code}: {stderr}")]
    ExecutionFailed { exit_code: i32, stderr: String },

    #[error("I/O error while waiting for command: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    /// Stable machine-readable name for the error, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Blocked { .. } => "blocked",
            RunError::RiskExceeded { .. } => "risk_exceeded",
            RunError::Timeout { .. } => "timeout",
            RunError::SpawnFailed { .. } => "spawn_failed",
            RunError::ExecutionFailed { .. } => "execution_failed",
            RunError::Io(_) => "io",
        }
    }
}
