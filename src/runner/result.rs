//! Structured result of a finished command.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::adapter::{AdaptationChange, AdaptedCommand};
use crate::security::SanitizationResult;
use crate::shell::ProcessOutput;

/// Outcome of one executed command.
///
/// A non-zero exit is still a result; check [`CommandResult::succeeded`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub command: String,
    /// The command actually executed, when adaptation changed it.
    pub adapted_command: Option<String>,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub was_adapted: bool,
    pub adaptation_changes: Vec<AdaptationChange>,
    pub sanitization_warnings: Vec<String>,
}

/// Wire form. Field names are a compatibility contract for external tools.
#[derive(Serialize)]
struct JsonCommandResult<'a> {
    adaptation_changes: &'a [AdaptationChange],
    adapted_command: Option<&'a str>,
    command: &'a str,
    duration_ms: u64,
    exit_code: i32,
    stderr: &'a str,
    stdout: &'a str,
    success: bool,
    was_adapted: bool,
    warnings: &'a [String],
}

impl CommandResult {
    pub(crate) fn new(
        command: &str,
        adaptation: Option<AdaptedCommand>,
        sanitization: Option<SanitizationResult>,
        output: ProcessOutput,
    ) -> Self {
        let (adapted_command, adaptation_changes) = match adaptation {
            Some(a) if a.was_modified() => (Some(a.adapted), a.changes),
            _ => (None, Vec::new()),
        };

        Self {
            command: command.to_string(),
            was_adapted: adapted_command.is_some(),
            adapted_command,
            exit_code: output.exit_code,
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
            duration: output.duration,
            adaptation_changes,
            sanitization_warnings: sanitization.map(|s| s.warnings).unwrap_or_default(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }

    fn wire(&self) -> JsonCommandResult<'_> {
        JsonCommandResult {
            adaptation_changes: &self.adaptation_changes,
            adapted_command: self.adapted_command.as_deref(),
            command: &self.command,
            duration_ms: self.duration_ms(),
            exit_code: self.exit_code,
            stderr: &self.stderr,
            stdout: &self.stdout,
            success: self.succeeded(),
            was_adapted: self.was_adapted,
            warnings: &self.sanitization_warnings,
        }
    }

    /// JSON object with keys sorted alphabetically at every level.
    pub fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        // serde_json's Map is ordered by key, so nested change objects come
        // out sorted as well.
        serde_json::to_value(self.wire())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_json_value()?)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_json_value()?)
    }
}

impl Serialize for CommandResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}
