//! Shell dialect adaptation.
//!
//! Commands are usually written in bash syntax. Before they run under a
//! different shell, [`adapt`] folds an ordered list of rewrite passes over
//! the text and records every substitution it made.

mod passes;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Syntax variant of the shell a command will run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellDialect {
    Bash,
    Zsh,
    Posix,
}

impl ShellDialect {
    /// Resolve the dialect from a shell executable path such as `/bin/zsh`.
    ///
    /// Anything that is neither bash nor zsh is treated as a generic POSIX
    /// shell.
    pub fn from_shell_path(shell: impl AsRef<Path>) -> Self {
        let name = shell
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.starts_with("zsh") {
            ShellDialect::Zsh
        } else if name.starts_with("bash") {
            ShellDialect::Bash
        } else {
            ShellDialect::Posix
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShellDialect::Bash => "bash",
            ShellDialect::Zsh => "zsh",
            ShellDialect::Posix => "posix",
        }
    }
}

impl fmt::Display for ShellDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShellDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bash" => Ok(ShellDialect::Bash),
            "zsh" => Ok(ShellDialect::Zsh),
            "posix" | "sh" => Ok(ShellDialect::Posix),
            other => Err(format!("unknown shell dialect '{}' (expected bash, zsh or posix)", other)),
        }
    }
}

/// Category of a recorded rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    ArrayExpansion,
    EchoEscape,
    ReadSyntax,
    RegexMatching,
    CommandSubstitution,
    ParameterExpansion,
    GlobQualifier,
    Quoting,
    Other,
}

/// A single substitution made by a rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptationChange {
    pub description: String,
    pub original: String,
    pub replacement: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}

impl AdaptationChange {
    pub fn new(
        kind: ChangeKind,
        description: impl Into<String>,
        original: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            original: original.into(),
            replacement: replacement.into(),
        }
    }
}

/// Output of [`adapt`]. Changes are listed in the order the passes ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptedCommand {
    pub original: String,
    pub adapted: String,
    pub changes: Vec<AdaptationChange>,
    pub target_dialect: ShellDialect,
}

impl AdaptedCommand {
    pub fn was_modified(&self) -> bool {
        self.original != self.adapted
    }
}

/// Rewrite `command` for the `target` dialect.
///
/// Never fails: a pass that does not recognise (or cannot safely parse) its
/// construct leaves the text untouched.
pub fn adapt(command: &str, target: ShellDialect) -> AdaptedCommand {
    let (adapted, changes) = passes::for_dialect(target).iter().fold(
        (command.to_string(), Vec::new()),
        |(text, mut changes), pass| match pass(&text) {
            Some((next, change)) if next != text => {
                debug!(kind = ?change.kind, original = %change.original, "Applied rewrite");
                changes.push(change);
                (next, changes)
            }
            _ => (text, changes),
        },
    );

    AdaptedCommand {
        original: command.to_string(),
        adapted,
        changes,
        target_dialect: target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_escape_scenario() {
        let result = adapt("echo -e \"Hello\\nWorld\"", ShellDialect::Zsh);
        assert_eq!(result.adapted, "echo \"Hello\\nWorld\"");
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].kind, ChangeKind::EchoEscape);
        assert!(result.was_modified());
    }

    #[test]
    fn test_backtick_scenario() {
        let result = adapt("echo `date`", ShellDialect::Zsh);
        assert_eq!(result.adapted, "echo $(date)");
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].kind, ChangeKind::CommandSubstitution);
    }

    #[test]
    fn test_read_prompt_scenario() {
        let result = adapt("read -p \"Name: \" name", ShellDialect::Zsh);
        assert_eq!(result.adapted, "read \"name?Name: \"");
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].kind, ChangeKind::ReadSyntax);
    }

    #[test]
    fn test_single_quoted_literal_keeps_meaning() {
        let result = adapt("grep 'echo -e foo' script.sh", ShellDialect::Zsh);
        assert_eq!(result.adapted, "grep 'echo -e foo' script.sh");
        assert!(result.changes.is_empty());
    }

    #[test]
    fn test_plain_command_unchanged() {
        for dialect in [ShellDialect::Zsh, ShellDialect::Bash, ShellDialect::Posix] {
            let result = adapt("ls -la", dialect);
            assert_eq!(result.adapted, "ls -la");
            assert!(result.changes.is_empty());
            assert!(!result.was_modified());
        }
    }

    #[test]
    fn test_changes_follow_pass_order() {
        let result = adapt("echo -e `whoami` \"${names[*]}\"", ShellDialect::Zsh);
        assert_eq!(result.adapted, "echo $(whoami) \"${(j: :)names}\"");
        let kinds: Vec<ChangeKind> = result.changes.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::CommandSubstitution,
                ChangeKind::ArrayExpansion,
                ChangeKind::EchoEscape,
            ]
        );
    }

    #[test]
    fn test_adaptation_is_idempotent() {
        let inputs = [
            "echo -e \"a\\tb\"",
            "echo `date` `whoami`",
            "read -p 'Continue? ' answer",
            "[[ $v =~ ^\\d+$ ]] && echo num",
            "printf '%s\\n' \"${items[*]}\"",
            "echo -e -e \"x\"",
            "grep 'echo -e foo' script.sh; echo -e bar",
            "read -p \"Hi $USER: \" name",
            "ls -la",
        ];
        for dialect in [ShellDialect::Zsh, ShellDialect::Bash, ShellDialect::Posix] {
            for input in inputs {
                let once = adapt(input, dialect);
                let twice = adapt(&once.adapted, dialect);
                assert!(twice.changes.is_empty(), "{} not idempotent for {}", input, dialect);
                assert_eq!(twice.adapted, once.adapted);
            }
        }
    }

    #[test]
    fn test_bash_target_only_rewrites_zsh_syntax() {
        let result = adapt("echo ${(U)name} `date`", ShellDialect::Bash);
        assert_eq!(result.adapted, "echo ${name^^} `date`");
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].kind, ChangeKind::ParameterExpansion);
    }

    #[test]
    fn test_posix_target_modernises_substitution() {
        let result = adapt("echo -e `date`", ShellDialect::Posix);
        assert_eq!(result.adapted, "echo -e $(date)");
        assert_eq!(result.changes.len(), 1);
    }

    #[test]
    fn test_dialect_from_shell_path() {
        assert_eq!(ShellDialect::from_shell_path("/bin/zsh"), ShellDialect::Zsh);
        assert_eq!(ShellDialect::from_shell_path("/usr/local/bin/bash"), ShellDialect::Bash);
        assert_eq!(ShellDialect::from_shell_path("/bin/sh"), ShellDialect::Posix);
        assert_eq!(ShellDialect::from_shell_path("/usr/bin/fish"), ShellDialect::Posix);
        assert_eq!(ShellDialect::from_shell_path(""), ShellDialect::Posix);
    }

    #[test]
    fn test_dialect_parse() {
        assert_eq!("ZSH".parse::<ShellDialect>(), Ok(ShellDialect::Zsh));
        assert_eq!("sh".parse::<ShellDialect>(), Ok(ShellDialect::Posix));
        assert!("fish".parse::<ShellDialect>().is_err());
    }

    #[test]
    fn test_change_serializes_with_type_key() {
        let change = AdaptationChange::new(ChangeKind::EchoEscape, "d", "echo -e", "echo");
        let json = serde_json::to_value(&change).unwrap_or_default();
        assert_eq!(json["type"], "echo_escape");
        assert_eq!(json["original"], "echo -e");
        assert_eq!(json["replacement"], "echo");
    }
}
