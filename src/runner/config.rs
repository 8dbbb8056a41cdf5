//! Runner configuration.
//!
//! Defaults come from the process environment: the `SHELL` variable picks
//! the shell (and therefore the target dialect), the current directory and
//! environment are inherited.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapter::ShellDialect;
use crate::security::RiskLevel;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_RISK: RiskLevel = RiskLevel::High;
const FALLBACK_SHELL: &str = "/bin/sh";

fn default_shell() -> PathBuf {
    // Prefer the user's configured shell, but keep a safe fallback.
    std::env::var_os("SHELL")
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(FALLBACK_SHELL))
}

fn default_working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Settings for one [`Runner`](super::Runner). Fixed once the runner is built.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Shell executable, invoked as `<shell> -c <command>`.
    pub shell: PathBuf,
    /// Dialect commands are adapted to. Follows `shell` unless overridden.
    pub dialect: ShellDialect,
    pub working_dir: PathBuf,
    /// Complete child environment.
    pub env: HashMap<String, String>,
    pub timeout: Duration,
    pub adapt_commands: bool,
    pub sanitize_commands: bool,
    /// Highest risk level that may still execute.
    pub max_risk_level: RiskLevel,
    pub capture_output: bool,
    /// `None` keeps every result; `Some(n)` keeps the newest `n`.
    pub history_capacity: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let shell = default_shell();
        Self {
            dialect: ShellDialect::from_shell_path(&shell),
            shell,
            working_dir: default_working_dir(),
            env: std::env::vars().collect(),
            timeout: DEFAULT_TIMEOUT,
            adapt_commands: true,
            sanitize_commands: true,
            max_risk_level: DEFAULT_MAX_RISK,
            capture_output: true,
            history_capacity: None,
        }
    }
}

impl RunnerConfig {
    /// Use a different shell. The dialect is re-derived from its path.
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self.dialect = ShellDialect::from_shell_path(&self.shell);
        self
    }

    /// Force a dialect regardless of the shell path.
    pub fn with_dialect(mut self, dialect: ShellDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Add or override a single variable on top of the current environment.
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Replace the whole child environment.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_adapt_commands(mut self, enabled: bool) -> Self {
        self.adapt_commands = enabled;
        self
    }

    pub fn with_sanitize_commands(mut self, enabled: bool) -> Self {
        self.sanitize_commands = enabled;
        self
    }

    pub fn with_max_risk_level(mut self, level: RiskLevel) -> Self {
        self.max_risk_level = level;
        self
    }

    pub fn with_capture_output(mut self, enabled: bool) -> Self {
        self.capture_output = enabled;
        self
    }

    pub fn with_history_capacity(mut self, capacity: Option<usize>) -> Self {
        self.history_capacity = capacity;
        self
    }
}
