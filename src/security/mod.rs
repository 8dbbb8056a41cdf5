//! Security module for command analysis and safety checks.
//!
//! This module classifies commands into risk tiers, collects advisory
//! warnings, and decides whether a command may run under a configured
//! risk ceiling.

mod analyzer;
mod gate;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use analyzer::analyze;
pub use gate::{gate_command, ExecutionDecision};

/// Ordered severity bucket assigned to a command.
///
/// Variants are declared from least to most severe, so the derived `Ord`
/// matches `rank()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Safe,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// Integer rank, `Safe == 0` up to `Critical == 4`.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Combine two findings. More findings can only raise the level.
    pub fn combine(self, other: RiskLevel) -> RiskLevel {
        self.max(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown risk level '{}' (expected safe, low, medium, high or critical)", s))
    }
}

/// Verdict produced by [`analyze`].
///
/// The constructors keep `is_allowed == (risk_level < Critical)` and
/// `blocked_reason.is_some() == !is_allowed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizationResult {
    pub is_allowed: bool,
    pub warnings: Vec<String>,
    pub blocked_reason: Option<String>,
    pub risk_level: RiskLevel,
}

impl SanitizationResult {
    /// An allowed verdict. A `Critical` level is clamped to a block so the
    /// invariants cannot be violated by callers.
    pub fn allowed(risk_level: RiskLevel, warnings: Vec<String>) -> Self {
        if risk_level == RiskLevel::Critical {
            return Self::blocked("Command classified as critical risk", warnings);
        }
        Self {
            is_allowed: true,
            warnings,
            blocked_reason: None,
            risk_level,
        }
    }

    pub fn blocked(reason: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            is_allowed: false,
            warnings,
            blocked_reason: Some(reason.into()),
            risk_level: RiskLevel::Critical,
        }
    }

    pub fn safe() -> Self {
        Self::allowed(RiskLevel::Safe, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_is_total_order() {
        let ranks: Vec<u8> = RiskLevel::ALL.iter().map(|l| l.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
        assert!(RiskLevel::Safe < RiskLevel::Low);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_combine_takes_max() {
        assert_eq!(RiskLevel::Low.combine(RiskLevel::High), RiskLevel::High);
        assert_eq!(RiskLevel::High.combine(RiskLevel::Low), RiskLevel::High);
        assert_eq!(RiskLevel::Safe.combine(RiskLevel::Safe), RiskLevel::Safe);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("HIGH".parse::<RiskLevel>(), Ok(RiskLevel::High));
        assert_eq!(" medium ".parse::<RiskLevel>(), Ok(RiskLevel::Medium));
        assert!("severe".parse::<RiskLevel>().is_err());
        assert_eq!(RiskLevel::Critical.to_string(), "critical");
    }

    #[test]
    fn test_sanitization_invariants() {
        let ok = SanitizationResult::allowed(RiskLevel::Medium, vec!["w".into()]);
        assert!(ok.is_allowed);
        assert!(ok.blocked_reason.is_none());

        let clamped = SanitizationResult::allowed(RiskLevel::Critical, Vec::new());
        assert!(!clamped.is_allowed);
        assert!(clamped.blocked_reason.is_some());

        let blocked = SanitizationResult::blocked("nope", Vec::new());
        assert_eq!(blocked.risk_level, RiskLevel::Critical);
        assert_eq!(blocked.blocked_reason.as_deref(), Some("nope"));
    }
}
