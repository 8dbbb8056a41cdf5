//! Text and JSON rendering for the command line.
//!
//! Everything here builds strings; the binary decides where they are printed.
//! JSON objects go through [`serde_json::Value`] so keys always come out
//! sorted.

use serde_json::{json, Value};

use crate::adapter::AdaptedCommand;
use crate::error::RunError;
use crate::runner::{CommandPlan, CommandResult};
use crate::security::ExecutionDecision;

fn decision_name(decision: &ExecutionDecision) -> &'static str {
    match decision {
        ExecutionDecision::Execute => "execute",
        ExecutionDecision::Block { .. } => "block",
        ExecutionDecision::RiskExceeded { .. } => "risk_exceeded",
    }
}

fn change_lines(adapted: &AdaptedCommand) -> Vec<String> {
    adapted
        .changes
        .iter()
        .map(|c| format!("  - {}: {} -> {}", c.description, c.original, c.replacement))
        .collect()
}

/// Notes about a finished command, meant for stderr alongside its output.
pub fn result_notes(result: &CommandResult) -> Vec<String> {
    let mut notes = Vec::new();
    if let Some(adapted) = &result.adapted_command {
        notes.push(format!("adapted: {}", adapted));
    }
    for warning in &result.sanitization_warnings {
        notes.push(format!("warning: {}", warning));
    }
    notes
}

/// One array element per attempted command: a result object, or an error
/// object for a command that produced no result.
pub fn sequence_json(outcomes: &[Result<CommandResult, RunError>]) -> serde_json::Result<String> {
    let values = outcomes
        .iter()
        .map(|outcome| match outcome {
            Ok(result) => result.to_json_value(),
            Err(err) => Ok(error_value(err)),
        })
        .collect::<serde_json::Result<Vec<_>>>()?;
    serde_json::to_string_pretty(&Value::Array(values))
}

pub fn plan_json(plan: &CommandPlan) -> serde_json::Result<String> {
    let verdict = plan.sanitization.as_ref();
    let value = json!({
        "adaptation": plan.adaptation.as_ref().map(serde_json::to_value).transpose()?,
        "blocked_reason": verdict.and_then(|v| v.blocked_reason.clone()),
        "command": plan.command,
        "decision": decision_name(&plan.decision),
        "is_allowed": verdict.map(|v| v.is_allowed),
        "risk_level": verdict.map(|v| v.risk_level.as_str()),
        "warnings": verdict.map(|v| v.warnings.clone()).unwrap_or_default(),
    });
    serde_json::to_string_pretty(&value)
}

pub fn plan_text(plan: &CommandPlan) -> String {
    let mut lines = vec![format!("command: {}", plan.command)];

    match &plan.sanitization {
        Some(verdict) => {
            lines.push(format!("risk: {}", verdict.risk_level));
            for warning in &verdict.warnings {
                lines.push(format!("warning: {}", warning));
            }
        }
        None => lines.push("risk: not checked".to_string()),
    }

    lines.push(match &plan.decision {
        ExecutionDecision::Execute => "decision: execute".to_string(),
        ExecutionDecision::Block { reason } => format!("decision: blocked ({})", reason),
        ExecutionDecision::RiskExceeded { level, max } => {
            format!("decision: rejected ({} exceeds maximum {})", level, max)
        }
    });

    if let Some(adapted) = plan.adaptation.as_ref().filter(|a| a.was_modified()) {
        lines.push(format!("adapted ({}): {}", adapted.target_dialect, adapted.adapted));
        lines.extend(change_lines(adapted));
    }

    lines.join("\n")
}

pub fn adapted_json(adapted: &AdaptedCommand) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::to_value(adapted)?)
}

/// Adapted command on the first line, one line per change after it.
pub fn adapted_text(adapted: &AdaptedCommand) -> String {
    let mut lines = vec![adapted.adapted.clone()];
    lines.extend(change_lines(adapted));
    lines.join("\n")
}

fn error_value(err: &RunError) -> Value {
    json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
        }
    })
}

pub fn error_json(err: &RunError) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&error_value(err))
}
