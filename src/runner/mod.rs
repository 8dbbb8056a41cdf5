//! Command orchestration.
//!
//! A [`Runner`] takes a raw command through
//!
//! ```text
//! Received → Classified → { Blocked | RiskRejected | Adapted } → Executing → { Completed | TimedOut | SpawnFailed }
//! ```
//!
//! and records every completed [`CommandResult`] in its history. Runs through
//! one runner are serialized: the history lock is held from classification
//! until the result is appended, so history order is execution order.

mod config;
mod history;
mod result;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::adapter::{adapt, AdaptedCommand};
use crate::error::RunError;
use crate::security::{analyze, gate_command, ExecutionDecision, SanitizationResult};
use crate::shell::ShellExecutor;

pub use config::{RunnerConfig, DEFAULT_MAX_RISK, DEFAULT_TIMEOUT};
pub use history::History;
pub use result::CommandResult;

/// Everything decided about a command before it runs.
#[derive(Debug, Clone)]
pub struct CommandPlan {
    pub command: String,
    /// `None` when sanitization is disabled.
    pub sanitization: Option<SanitizationResult>,
    pub decision: ExecutionDecision,
    /// `None` when adaptation is disabled or the command will not run.
    pub adaptation: Option<AdaptedCommand>,
}

impl CommandPlan {
    /// The text handed to the shell.
    pub fn command_to_execute(&self) -> &str {
        self.adaptation
            .as_ref()
            .map(|a| a.adapted.as_str())
            .unwrap_or(&self.command)
    }

    pub fn will_execute(&self) -> bool {
        self.decision == ExecutionDecision::Execute
    }

    fn into_executable(self) -> Result<Self, RunError> {
        match &self.decision {
            ExecutionDecision::Execute => Ok(self),
            ExecutionDecision::Block { reason } => {
                warn!(command = %self.command, %reason, "Command blocked");
                Err(RunError::Blocked {
                    reason: reason.clone(),
                })
            }
            ExecutionDecision::RiskExceeded { level, max } => {
                warn!(command = %self.command, %level, %max, "Command rejected by risk ceiling");
                Err(RunError::RiskExceeded {
                    level: *level,
                    max: *max,
                })
            }
        }
    }
}

/// Serialized command runner with an in-memory history.
///
/// # Example
///
/// ```no_run
/// use rusty_cmd::runner::{Runner, RunnerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), rusty_cmd::RunError> {
///     let runner = Runner::new(RunnerConfig::default());
///     let result = runner.run("echo `date`").await?;
///     println!("{}", result.to_json_pretty().unwrap_or_default());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Runner {
    config: RunnerConfig,
    executor: ShellExecutor,
    history: Mutex<History>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        let executor = ShellExecutor::new(
            config.shell.clone(),
            config.working_dir.clone(),
            config.env.clone(),
            config.capture_output,
        );
        let history = Mutex::new(History::new(config.history_capacity));
        Self {
            config,
            executor,
            history,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Classify, gate and adapt a command without running it.
    pub fn check(&self, command: &str) -> CommandPlan {
        let sanitization = self.config.sanitize_commands.then(|| analyze(command));
        let decision = sanitization
            .as_ref()
            .map(|verdict| gate_command(verdict, self.config.max_risk_level))
            .unwrap_or(ExecutionDecision::Execute);

        let adaptation = (self.config.adapt_commands && decision == ExecutionDecision::Execute)
            .then(|| adapt(command, self.config.dialect));

        CommandPlan {
            command: command.to_string(),
            sanitization,
            decision,
            adaptation,
        }
    }

    async fn run_locked(&self, history: &mut History, command: &str) -> Result<CommandResult, RunError> {
        let plan = self.check(command).into_executable()?;
        let to_execute = plan.command_to_execute();
        info!(command, executed = to_execute, dialect = %self.config.dialect, "Running command");

        let output = self.executor.execute(to_execute, self.config.timeout).await?;
        let result = CommandResult::new(command, plan.adaptation, plan.sanitization, output);

        info!(exit_code = result.exit_code, duration_ms = result.duration_ms(), "Command completed");
        history.push(result.clone());
        Ok(result)
    }

    /// Run one command through the full pipeline.
    ///
    /// # Errors
    /// [`RunError::Blocked`], [`RunError::RiskExceeded`], [`RunError::Timeout`],
    /// [`RunError::SpawnFailed`] or [`RunError::Io`]. A non-zero exit code is
    /// not an error.
    pub async fn run(&self, command: &str) -> Result<CommandResult, RunError> {
        let mut history = self.history.lock().await;
        self.run_locked(&mut history, command).await
    }

    /// Run and return trimmed stdout, treating a non-zero exit as an error.
    pub async fn run_output(&self, command: &str) -> Result<String, RunError> {
        let result = self.run(command).await?;
        if result.succeeded() {
            Ok(result.stdout.trim().to_string())
        } else {
            Err(RunError::ExecutionFailed {
                exit_code: result.exit_code,
                stderr: result.stderr,
            })
        }
    }

    /// Run commands in order without interleaving other callers.
    ///
    /// Returns one outcome per command that was attempted. With
    /// `stop_on_failure`, stops after the first outcome that is an error or a
    /// result that did not succeed; otherwise every command is attempted.
    pub async fn run_sequence<I, S>(&self, commands: I, stop_on_failure: bool) -> Vec<Result<CommandResult, RunError>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut history = self.history.lock().await;
        let mut outcomes = Vec::new();

        for command in commands {
            let outcome = self.run_locked(&mut history, command.as_ref()).await;
            let failed = !matches!(&outcome, Ok(result) if result.succeeded());
            outcomes.push(outcome);
            if failed && stop_on_failure {
                info!(attempted = outcomes.len(), "Stopping sequence at first failure");
                break;
            }
        }

        outcomes
    }

    /// Snapshot of every recorded result, oldest first.
    pub async fn history(&self) -> Vec<CommandResult> {
        self.history.lock().await.entries()
    }

    pub async fn recent_history(&self, n: usize) -> Vec<CommandResult> {
        self.history.lock().await.recent(n)
    }

    pub async fn last_result(&self) -> Option<CommandResult> {
        self.history.lock().await.last().cloned()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }
}
