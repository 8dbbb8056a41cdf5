//! RustyCmd - shell command adaptation and safety pipeline
//!
//! This library takes a raw shell command through:
//! - Risk classification against built-in rule tables ([`security`])
//! - Gating against a configured risk ceiling
//! - Rewriting for the target shell dialect ([`adapter`])
//! - Execution under a deadline with captured output ([`shell`])
//! - Recording of every completed run ([`runner`])
//!
//! # Example
//!
//! ```no_run
//! use rusty_cmd::{Runner, RunnerConfig, RiskLevel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rusty_cmd::RunError> {
//!     let runner = Runner::new(
//!         RunnerConfig::default()
//!             .with_shell("/bin/zsh")
//!             .with_max_risk_level(RiskLevel::Medium),
//!     );
//!
//!     // Runs as `echo $(date)` under zsh
//!     let result = runner.run("echo `date`").await?;
//!     assert!(result.was_adapted);
//!
//!     // Never reaches the shell
//!     assert!(runner.run("rm -rf /").await.is_err());
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod error;
pub mod render;
pub mod runner;
pub mod security;
pub mod shell;
pub mod utils;

// Re-export commonly used types
pub use adapter::{adapt, AdaptationChange, AdaptedCommand, ChangeKind, ShellDialect};
pub use error::RunError;
pub use runner::{CommandPlan, CommandResult, Runner, RunnerConfig};
pub use security::{analyze, ExecutionDecision, RiskLevel, SanitizationResult};
