//! Logging initialization and configuration.
//!
//! Logs go to stderr so they never mix with command output on stdout. When
//! `RUSTY_CMD_LOG_DIR` is set, they are written to a file in that directory
//! instead, one file per run.
//!
//! # Configuration
//!
//! The log level can be controlled via the `RUST_LOG` environment variable:
//! - `RUST_LOG=debug` - Show every applied rewrite and matched risk rule
//! - `RUST_LOG=info` - Show each command run and its exit status
//! - `RUST_LOG=warn` - Show blocked and rejected commands (default)
//! - `RUST_LOG=error` - Show errors only

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_DIR_ENV: &str = "RUSTY_CMD_LOG_DIR";

/// Per-run log file name, e.g. `rusty-cmd.2024-12-06-14-30-25.log`.
fn log_file_path(dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    dir.join(format!("rusty-cmd.{}.log", timestamp))
}

fn open_log_file(dir: &Path) -> std::io::Result<(fs::File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let path = log_file_path(dir);
    let file = fs::File::create(&path)?;
    Ok((file, path))
}

fn install(subscriber: impl SubscriberInitExt) {
    if subscriber.try_init().is_err() {
        tracing::debug!("Global subscriber already set");
    }
}

/// Initialize the global subscriber.
///
/// `default_level` applies when `RUST_LOG` is unset or invalid. The returned
/// guard flushes the file writer on drop and must be kept alive for the whole
/// run. `None` means logging goes to stderr.
///
/// Calling this twice is harmless; the second subscriber is ignored.
pub fn init_logging(default_level: &str) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_dir = std::env::var_os(LOG_DIR_ENV)
        .filter(|d| !d.is_empty())
        .map(PathBuf::from);

    let Some(dir) = log_dir else {
        let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
        install(tracing_subscriber::registry().with(env_filter).with(stderr_layer));
        return None;
    };

    let (log_file, log_path) = match open_log_file(&dir) {
        Ok(opened) => opened,
        Err(e) => {
            eprintln!("Warning: Failed to create log file in {}: {}", dir.display(), e);
            install(tracing_subscriber::registry().with(env_filter).with(fmt::layer().with_writer(std::io::stderr)));
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    install(tracing_subscriber::registry().with(env_filter).with(file_layer));

    tracing::info!("Logging initialized - writing to {}", log_path.display());
    Some(guard)
}
