use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rusty_cmd::{RiskLevel, RunnerConfig, ShellDialect};

#[derive(Parser, Debug)]
#[command(name = "rusty-cmd", version, about = "Adapt, vet and run shell commands")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(long, global = true, help = "Shell executable (defaults to $SHELL)")]
    pub shell: Option<PathBuf>,
    #[arg(long, global = true, help = "Target dialect, overriding the one derived from the shell")]
    pub dialect: Option<ShellDialect>,
    #[arg(long, global = true, help = "Working directory for commands")]
    pub cwd: Option<PathBuf>,
    #[arg(long, global = true, value_parser = parse_timeout, help = "Timeout in seconds")]
    pub timeout: Option<Duration>,
    #[arg(long, global = true, help = "Highest risk level allowed to run (safe, low, medium, high, critical)")]
    pub max_risk: Option<RiskLevel>,
    #[arg(long, global = true, help = "Run commands exactly as written")]
    pub no_adapt: bool,
    #[arg(long, global = true, help = "Skip risk classification")]
    pub no_sanitize: bool,
    #[arg(long, global = true, help = "Let the command write straight to this terminal")]
    pub no_capture: bool,
    #[arg(
        short = 'e',
        long = "env",
        global = true,
        value_parser = parse_env_var,
        help = "Extra environment variable (KEY=VALUE), repeatable"
    )]
    pub env: Vec<(String, String)>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one command through the full pipeline
    Run { command: String },
    /// Run several commands in order
    Seq {
        #[arg(long, default_value_t = false, help = "Continue after a command fails")]
        keep_going: bool,
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// Show what would happen to a command without running it
    Check { command: String },
    /// Print the command rewritten for the target dialect
    Adapt { command: String },
}

impl Cli {
    pub fn runner_config(&self) -> RunnerConfig {
        let mut config = RunnerConfig::default();
        if let Some(shell) = &self.shell {
            config = config.with_shell(shell.clone());
        }
        if let Some(dialect) = self.dialect {
            config = config.with_dialect(dialect);
        }
        if let Some(cwd) = &self.cwd {
            config = config.with_working_dir(cwd.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(max) = self.max_risk {
            config = config.with_max_risk_level(max);
        }
        for (key, value) in &self.env {
            config = config.with_env_var(key.clone(), value.clone());
        }
        config
            .with_adapt_commands(!self.no_adapt)
            .with_sanitize_commands(!self.no_sanitize)
            .with_capture_output(!self.no_capture)
    }
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("invalid timeout '{}'", s))?;
    if secs <= 0.0 {
        return Err("timeout must be positive".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

fn parse_env_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_var() {
        assert_eq!(parse_env_var("A=1"), Ok(("A".to_string(), "1".to_string())));
        assert_eq!(parse_env_var("A=b=c"), Ok(("A".to_string(), "b=c".to_string())));
        assert!(parse_env_var("=1").is_err());
        assert!(parse_env_var("A").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("1.5"), Ok(Duration::from_millis(1500)));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn test_flags_map_onto_config() {
        let cli = Cli::parse_from([
            "rusty-cmd",
            "--shell",
            "/bin/bash",
            "--dialect",
            "zsh",
            "--max-risk",
            "low",
            "--no-adapt",
            "-e",
            "FOO=bar",
            "run",
            "echo hi",
        ]);
        let config = cli.runner_config();
        assert_eq!(config.shell, PathBuf::from("/bin/bash"));
        assert_eq!(config.dialect, ShellDialect::Zsh);
        assert_eq!(config.max_risk_level, RiskLevel::Low);
        assert!(!config.adapt_commands);
        assert!(config.sanitize_commands);
        assert_eq!(config.env.get("FOO").map(String::as_str), Some("bar"));
        assert!(matches!(cli.command, Commands::Run { ref command } if command == "echo hi"));
    }
}
