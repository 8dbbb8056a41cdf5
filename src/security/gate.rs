//! Command execution gating with security verdict enforcement.
//!
//! This module turns a [`SanitizationResult`] and the configured risk
//! ceiling into a single decision, so every caller enforces verdicts the
//! same way.

use super::{RiskLevel, SanitizationResult};

/// Result of passing a classified command through the security gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionDecision {
    /// Command may be executed
    Execute,
    /// Command matched a critical pattern and must never run
    Block { reason: String },
    /// Command is allowed by the classifier but riskier than the ceiling
    RiskExceeded { level: RiskLevel, max: RiskLevel },
}

/// Evaluates a verdict against the configured maximum risk level.
///
/// # Arguments
/// * `verdict` - The classifier's result for the command
/// * `max_risk` - Highest level that may still execute
///
/// # Examples
/// ```
/// use rusty_cmd::security::{analyze, gate_command, ExecutionDecision, RiskLevel};
///
/// let decision = gate_command(&analyze("ls -la"), RiskLevel::High);
/// assert_eq!(decision, ExecutionDecision::Execute);
///
/// let decision = gate_command(&analyze("sudo apt update"), RiskLevel::Low);
/// assert!(matches!(decision, ExecutionDecision::RiskExceeded { .. }));
///
/// let decision = gate_command(&analyze("rm -rf /"), RiskLevel::Critical);
/// assert!(matches!(decision, ExecutionDecision::Block { .. }));
/// ```
pub fn gate_command(verdict: &SanitizationResult, max_risk: RiskLevel) -> ExecutionDecision {
    if !verdict.is_allowed {
        return ExecutionDecision::Block {
            reason: verdict
                .blocked_reason
                .clone()
                .unwrap_or_else(|| format!("Command classified as {} risk", verdict.risk_level)),
        };
    }

    if verdict.risk_level > max_risk {
        return ExecutionDecision::RiskExceeded {
            level: verdict.risk_level,
            max: max_risk,
        };
    }

    ExecutionDecision::Execute
}
