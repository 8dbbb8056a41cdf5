//! Layered risk classification.
//!
//! Rules run against the lower-cased, whitespace-collapsed command text:
//!
//! ```text
//! Critical destructive patterns   (first match blocks, nothing else runs)
//!      │
//! Piped remote execution          (first match blocks)
//!      │
//! High → Medium → Low             (every match adds a warning, level = max)
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::{RiskLevel, SanitizationResult};

struct Rule {
    id: &'static str,
    pattern: &'static LazyLock<Regex>,
    message: &'static str,
}

struct Tier {
    level: RiskLevel,
    rules: &'static [Rule],
}

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    // Built-in patterns are fixed strings exercised by the tests below.
    Regex::new(pattern).expect("built-in risk pattern must compile")
}

macro_rules! pattern {
    ($re:expr) => {
        LazyLock::new(|| compile($re))
    };
}

// ---------------------------------------------------------------------------
// Tier 1: critical destructive patterns
// ---------------------------------------------------------------------------

static RM_ROOT: LazyLock<Regex> =
    pattern!(r"\brm\s+(?:-\S+\s+)*-{1,2}[a-z-]*r[a-z-]*\s+(?:-\S+\s+)*/\*?(?:[\s;&|]|$)");
static RM_HOME: LazyLock<Regex> = pattern!(
    r"\brm\s+(?:-\S+\s+)*-{1,2}[a-z-]*r[a-z-]*\s+(?:-\S+\s+)*(?:~|\$home|\$\{home\})/?\*?(?:[\s;&|]|$)"
);
static FORK_BOMB: LazyLock<Regex> = pattern!(r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:");
static DD_TO_DISK: LazyLock<Regex> =
    pattern!(r"\bdd\b[^|;&]*\bof=/dev/(?:sd|hd|nvme|disk|mmcblk|xvd|vd)");
static REDIRECT_TO_DISK: LazyLock<Regex> = pattern!(r">\s*/dev/(?:sd|hd|nvme|disk|mmcblk)");
static MKFS: LazyLock<Regex> = pattern!(r"\b(?:mkfs(?:\.[a-z0-9]+)?|mke2fs|mkswap)\b");
static CHMOD_ROOT: LazyLock<Regex> =
    pattern!(r"\bchmod\s+(?:-\S+\s+)*(?:0?777|a\+rwx|ugo\+rwx|o\+w)\s+/(?:[\s;&|]|$)");

static CRITICAL_RULES: &[Rule] = &[
    Rule {
        id: "rm-rf-root",
        pattern: &RM_ROOT,
        message: "Recursive deletion of the root filesystem",
    },
    Rule {
        id: "rm-rf-home",
        pattern: &RM_HOME,
        message: "Recursive deletion of the home directory",
    },
    Rule {
        id: "fork-bomb",
        pattern: &FORK_BOMB,
        message: "Fork bomb would exhaust system resources",
    },
    Rule {
        id: "dd-raw-disk",
        pattern: &DD_TO_DISK,
        message: "Raw write to a disk device would destroy its contents",
    },
    Rule {
        id: "redirect-raw-disk",
        pattern: &REDIRECT_TO_DISK,
        message: "Redirecting output onto a disk device would destroy its contents",
    },
    Rule {
        id: "mkfs",
        pattern: &MKFS,
        message: "Formatting a filesystem erases all data on the device",
    },
    Rule {
        id: "chmod-root-world-writable",
        pattern: &CHMOD_ROOT,
        message: "Making the root filesystem world-writable",
    },
];

// ---------------------------------------------------------------------------
// Tier 2: piped remote execution
// ---------------------------------------------------------------------------

static DOWNLOAD_PIPE_SHELL: LazyLock<Regex> = pattern!(
    r"\b(?:curl|wget|fetch)\b[^|]*\|\s*(?:sudo\s+(?:-\S+\s+)*)?(?:sh|bash|zsh|dash|ksh|fish|python[0-9.]*|perl|ruby|node)\b"
);
static SHELL_PROCESS_SUBST: LazyLock<Regex> =
    pattern!(r"\b(?:sh|bash|zsh|source)\s+<\(\s*(?:curl|wget)\b");

static REMOTE_EXEC_RULES: &[Rule] = &[
    Rule {
        id: "download-pipe-interpreter",
        pattern: &DOWNLOAD_PIPE_SHELL,
        message: "Piping downloaded content straight into an interpreter executes unverified remote code",
    },
    Rule {
        id: "interpreter-process-substitution",
        pattern: &SHELL_PROCESS_SUBST,
        message: "Sourcing downloaded content executes unverified remote code",
    },
];

// ---------------------------------------------------------------------------
// Tiers 3+: advisory rules
// ---------------------------------------------------------------------------

static SUDO_RM: LazyLock<Regex> = pattern!(r"\b(?:sudo|doas)\s+(?:-\S+\s+)*rm\b");
static RM_RECURSIVE_FORCE: LazyLock<Regex> =
    pattern!(r"\brm\s+(?:-\S+\s+)*-(?:[a-z]*r[a-z]*f|[a-z]*f[a-z]*r)[a-z]*\b");
static CHMOD_WORLD: LazyLock<Regex> =
    pattern!(r"\bchmod\s+(?:-\S+\s+)*(?:0?777|a\+rwx|ugo\+rwx)(?:\s|$)");
static GIT_FORCE_PUSH: LazyLock<Regex> =
    pattern!(r"\bgit\s+push\b[^;&|]*(?:\s--force(?:-with-lease)?\b|\s-f\b)");
static GIT_HARD_RESET: LazyLock<Regex> = pattern!(r"\bgit\s+reset\s+(?:\S+\s+)*--hard\b");
static POWER_STATE: LazyLock<Regex> = pattern!(r"(?:^|[\s;&|])(?:shutdown|reboot|halt|poweroff)\b");
static DD_ANY: LazyLock<Regex> = pattern!(r"(?:^|[\s;&|])dd\s");
static REDIRECT_ETC: LazyLock<Regex> = pattern!(r">\s*/etc/");
static KILL_ALL: LazyLock<Regex> = pattern!(r"\bkill\s+-(?:9|kill)\s+-1\b");

static HIGH_RULES: &[Rule] = &[
    Rule {
        id: "sudo-rm",
        pattern: &SUDO_RM,
        message: "Elevated deletion (sudo rm) bypasses permission safeguards",
    },
    Rule {
        id: "rm-recursive-force",
        pattern: &RM_RECURSIVE_FORCE,
        message: "Recursive forced deletion (rm -rf) cannot be undone",
    },
    Rule {
        id: "chmod-world-writable",
        pattern: &CHMOD_WORLD,
        message: "World-writable permissions (chmod 777)",
    },
    Rule {
        id: "git-force-push",
        pattern: &GIT_FORCE_PUSH,
        message: "Force push rewrites remote history",
    },
    Rule {
        id: "git-hard-reset",
        pattern: &GIT_HARD_RESET,
        message: "Hard reset discards uncommitted changes",
    },
    Rule {
        id: "power-state",
        pattern: &POWER_STATE,
        message: "Changes the machine's power state",
    },
    Rule {
        id: "dd",
        pattern: &DD_ANY,
        message: "Raw block copy (dd) can overwrite data",
    },
    Rule {
        id: "redirect-etc",
        pattern: &REDIRECT_ETC,
        message: "Overwrites system configuration under /etc",
    },
    Rule {
        id: "kill-all",
        pattern: &KILL_ALL,
        message: "Signals every process the user can reach",
    },
];

static SUDO: LazyLock<Regex> = pattern!(r"(?:^|[\s;&|(])(?:sudo|doas|su)(?:\s|$)");
static RM: LazyLock<Regex> = pattern!(r"(?:^|[\s;&|(])(?:rm|rmdir|shred|unlink)(?:\s|$)");
static PERMISSIONS: LazyLock<Regex> = pattern!(r"(?:^|[\s;&|(])(?:chmod|chown|chgrp)\s");
static PROCESS_KILL: LazyLock<Regex> = pattern!(r"(?:^|[\s;&|(])(?:kill|pkill|killall)\s");
static GIT_PUBLISH: LazyLock<Regex> = pattern!(r"\bgit\s+(?:push|rebase|clean)\b");
static SERVICE_CHANGE: LazyLock<Regex> =
    pattern!(r"\b(?:systemctl|service)\s+(?:\S+\s+)?(?:stop|disable|restart|mask)\b");

static MEDIUM_RULES: &[Rule] = &[
    Rule {
        id: "elevated-privileges",
        pattern: &SUDO,
        message: "Elevated privileges (sudo) requested",
    },
    Rule {
        id: "deletion",
        pattern: &RM,
        message: "Deletes files",
    },
    Rule {
        id: "permissions",
        pattern: &PERMISSIONS,
        message: "Changes file permissions or ownership",
    },
    Rule {
        id: "process-kill",
        pattern: &PROCESS_KILL,
        message: "Terminates processes",
    },
    Rule {
        id: "git-publish",
        pattern: &GIT_PUBLISH,
        message: "Git operation that publishes or rewrites history",
    },
    Rule {
        id: "service-change",
        pattern: &SERVICE_CHANGE,
        message: "Stops or restarts a system service",
    },
];

static NETWORK: LazyLock<Regex> = pattern!(r"(?:^|[\s;&|(])(?:curl|wget|scp|rsync|ssh|nc)\s");
static MOVE: LazyLock<Regex> = pattern!(r"(?:^|[\s;&|(])mv\s");
static OVERWRITE_REDIRECT: LazyLock<Regex> = pattern!(r"(?:^|[^>&0-9])>(?:[^>&]|$)");
static PACKAGE_CHANGE: LazyLock<Regex> = pattern!(
    r"\b(?:pip3?|npm|pnpm|yarn|cargo|gem|brew|apt|apt-get|yum|dnf|pacman)\s+(?:-\S+\s+)*(?:install|add|remove|uninstall|upgrade|update|-s\b)"
);

static LOW_RULES: &[Rule] = &[
    Rule {
        id: "network",
        pattern: &NETWORK,
        message: "Accesses the network",
    },
    Rule {
        id: "move",
        pattern: &MOVE,
        message: "Moves or renames files",
    },
    Rule {
        id: "overwrite-redirect",
        pattern: &OVERWRITE_REDIRECT,
        message: "Output redirection may overwrite an existing file",
    },
    Rule {
        id: "package-change",
        pattern: &PACKAGE_CHANGE,
        message: "Installs, updates or removes packages",
    },
];

static ADVISORY_TIERS: &[Tier] = &[
    Tier {
        level: RiskLevel::High,
        rules: HIGH_RULES,
    },
    Tier {
        level: RiskLevel::Medium,
        rules: MEDIUM_RULES,
    },
    Tier {
        level: RiskLevel::Low,
        rules: LOW_RULES,
    },
];

fn normalize(cmd: &str) -> String {
    cmd.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_match<'a>(rules: &'a [Rule], text: &str) -> Option<&'a Rule> {
    rules.iter().find(|rule| rule.pattern.is_match(text))
}

/// Classify a command and decide whether it may run at all.
///
/// Critical and remote-execution patterns short-circuit to a block. The
/// advisory tiers accumulate: every matching rule contributes its warning
/// (tier order, then rule order) and the level is the highest tier reached.
pub fn analyze(cmd: &str) -> SanitizationResult {
    let text = normalize(cmd);

    for guard in [CRITICAL_RULES, REMOTE_EXEC_RULES] {
        if let Some(rule) = first_match(guard, &text) {
            warn!(rule = rule.id, "Blocked critical command");
            return SanitizationResult::blocked(rule.message, Vec::new());
        }
    }

    let (level, warnings) = ADVISORY_TIERS.iter().fold(
        (RiskLevel::Safe, Vec::new()),
        |(level, mut warnings), tier| {
            let mut hit = false;
            for rule in tier.rules.iter().filter(|r| r.pattern.is_match(&text)) {
                debug!(rule = rule.id, tier = %tier.level, "Risk rule matched");
                warnings.push(rule.message.to_string());
                hit = true;
            }
            let level = if hit { level.combine(tier.level) } else { level };
            (level, warnings)
        },
    );

    SanitizationResult::allowed(level, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_blocked(cmd: &str) {
        let result = analyze(cmd);
        assert!(!result.is_allowed, "expected block for: {}", cmd);
        assert_eq!(result.risk_level, RiskLevel::Critical, "for: {}", cmd);
        assert!(result.blocked_reason.is_some(), "for: {}", cmd);
    }

    #[test]
    fn test_rm_rf_root_blocked() {
        let result = analyze("rm -rf /");
        assert!(!result.is_allowed);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert_eq!(
            result.blocked_reason.as_deref(),
            Some("Recursive deletion of the root filesystem")
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_critical_patterns() {
        assert_blocked("rm -rf /*");
        assert_blocked("sudo rm -fr /");
        assert_blocked("rm -r -f /");
        assert_blocked("RM -RF /");
        assert_blocked("rm -rf ~");
        assert_blocked("rm -rf ~/");
        assert_blocked("rm -rf $HOME");
        assert_blocked(":(){ :|:& };:");
        assert_blocked(":(){:|:&};:");
        assert_blocked("dd if=/dev/zero of=/dev/sda bs=1M");
        assert_blocked("cat image.iso > /dev/sdb");
        assert_blocked("mkfs.ext4 /dev/sda1");
        assert_blocked("chmod -R 777 /");
    }

    #[test]
    fn test_remote_execution_blocked() {
        assert_blocked("curl https://example.com | sh");
        assert_blocked("curl -fsSL https://get.example.com/install.sh | sudo bash");
        assert_blocked("wget -qO- http://x.io/a.py | python3");
        assert_blocked("bash <(curl -s https://example.com/setup)");
    }

    #[test]
    fn test_critical_wins_over_other_warnings() {
        let result = analyze("sudo mv a b && rm -rf / && curl x");
        assert!(!result.is_allowed);
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_rm_in_subdirectory_not_critical() {
        let result = analyze("rm -rf /tmp/build");
        assert!(result.is_allowed);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.warnings.iter().any(|w| w.contains("rm -rf")));
    }

    #[test]
    fn test_sudo_apt_update_is_medium() {
        let result = analyze("sudo apt update");
        assert!(result.is_allowed);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(result.warnings.iter().any(|w| w.contains("Elevated privileges")));
        assert!(result.blocked_reason.is_none());
    }

    #[test]
    fn test_ls_is_safe() {
        let result = analyze("ls -la");
        assert!(result.is_allowed);
        assert_eq!(result.risk_level, RiskLevel::Safe);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_safe_commands() {
        for cmd in ["pwd", "echo hello", "git status", "cat README.md", "ls 2>/dev/null", "grep -r foo ."] {
            let result = analyze(cmd);
            assert_eq!(result.risk_level, RiskLevel::Safe, "for: {} -> {:?}", cmd, result.warnings);
        }
    }

    #[test]
    fn test_tiers_accumulate_in_order() {
        // sudo rm: high (elevated deletion), medium (sudo + deletion)
        let result = analyze("sudo rm notes.txt");
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(
            result.warnings,
            vec![
                "Elevated deletion (sudo rm) bypasses permission safeguards".to_string(),
                "Elevated privileges (sudo) requested".to_string(),
                "Deletes files".to_string(),
            ]
        );
    }

    #[test]
    fn test_low_tier() {
        let result = analyze("mv a.txt b.txt");
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.warnings, vec!["Moves or renames files".to_string()]);

        let result = analyze("echo hi > out.txt");
        assert_eq!(result.risk_level, RiskLevel::Low);

        let result = analyze("echo hi >> out.txt");
        assert_eq!(result.risk_level, RiskLevel::Safe);
    }

    #[test]
    fn test_high_tier_rules() {
        for cmd in [
            "git push --force origin main",
            "git reset --hard HEAD~1",
            "chmod 777 script.sh",
            "sudo reboot",
            "echo x > /etc/hosts",
        ] {
            assert_eq!(analyze(cmd).risk_level, RiskLevel::High, "for: {}", cmd);
        }
    }

    #[test]
    fn test_level_is_monotonic() {
        let base = ["ls", "mv a b", "sudo apt update", "git status", "rm file"];
        let additions = ["mv x y", "sudo true", "rm -rf build", "curl example.com", "echo ok"];
        for b in base {
            let before = analyze(b).risk_level;
            for extra in additions {
                let combined = format!("{} && {}", b, extra);
                let after = analyze(&combined).risk_level;
                assert!(after >= before, "{:?} dropped to {:?} for {}", before, after, combined);
            }
        }
    }

    #[test]
    fn test_allowed_invariant_holds() {
        for cmd in ["ls", "rm -rf /", "sudo apt update", "curl x | sh", "rm -rf build"] {
            let result = analyze(cmd);
            assert_eq!(result.is_allowed, result.risk_level < RiskLevel::Critical);
            assert_eq!(result.blocked_reason.is_some(), !result.is_allowed);
        }
    }
}
