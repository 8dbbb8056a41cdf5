//! Non-interactive shell subprocess execution.
//!
//! A command is handed to `<shell> -c <command>` with stdin closed, as the
//! leader of its own process group. Waiting for exit and draining both pipes
//! race a deadline as one unit of work; if the deadline wins the whole group
//! is terminated and the shell reaped before returning. Dropping an
//! in-flight execution kills the group as well.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::RunError;

/// Captured output of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit status, or `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// How long a timed-out group gets to exit after SIGTERM before SIGKILL.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// Signals a child's process group. Kills it on drop unless disarmed.
#[derive(Debug)]
struct ProcessGroup {
    pgid: Option<Pid>,
}

impl ProcessGroup {
    fn of(pid: Option<u32>) -> Self {
        let pgid = pid.and_then(|pid| i32::try_from(pid).ok()).map(Pid::from_raw);
        Self { pgid }
    }

    fn signal(&self, signal: Signal) {
        if let Some(pgid) = self.pgid {
            if let Err(e) = killpg(pgid, signal) {
                debug!(%pgid, ?signal, "Signalling process group failed (likely already gone): {}", e);
            }
        }
    }

    /// Leave the group alone from now on.
    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.signal(Signal::SIGKILL);
    }
}

/// Spawns commands through a fixed shell, directory and environment.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: PathBuf,
    working_dir: PathBuf,
    env: HashMap<String, String>,
    capture_output: bool,
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<&mut R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

impl ShellExecutor {
    /// # Arguments
    /// * `shell` - Shell executable, invoked as `<shell> -c <command>`
    /// * `working_dir` - Directory the command starts in
    /// * `env` - Complete environment for the child; nothing else is inherited
    /// * `capture_output` - Pipe stdout/stderr back instead of inheriting them
    pub fn new(
        shell: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
        env: HashMap<String, String>,
        capture_output: bool,
    ) -> Self {
        Self {
            shell: shell.into(),
            working_dir: working_dir.into(),
            env,
            capture_output,
        }
    }

    pub fn shell(&self) -> &PathBuf {
        &self.shell
    }

    fn command(&self, cmd: &str) -> Command {
        let mut c = Command::new(&self.shell);
        c.arg("-c").arg(cmd);
        c.current_dir(&self.working_dir);
        c.env_clear().envs(&self.env);
        c.stdin(Stdio::null());
        // New group with the shell as leader, so its descendants can be
        // signalled together.
        c.process_group(0);
        c.kill_on_drop(true);

        if self.capture_output {
            c.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            c.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        c
    }

    /// Run `cmd` to completion or until `deadline` elapses.
    ///
    /// # Errors
    /// - [`RunError::SpawnFailed`] if the shell cannot be started
    /// - [`RunError::Timeout`] if the process outlives `deadline`
    /// - [`RunError::Io`] if waiting on the child or reading a pipe fails
    pub async fn execute(&self, cmd: &str, deadline: Duration) -> Result<ProcessOutput, RunError> {
        let started = Instant::now();
        let mut child = self.command(cmd).spawn().map_err(|source| RunError::SpawnFailed {
            shell: self.shell.clone(),
            source,
        })?;
        debug!(pid = ?child.id(), shell = %self.shell.display(), "Spawned command");
        let mut group = ProcessGroup::of(child.id());

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let completion = async {
            let (status, out, err) = tokio::join!(
                child.wait(),
                read_pipe(stdout.as_mut()),
                read_pipe(stderr.as_mut())
            );
            Ok::<_, io::Error>((status?, out?, err?))
        };

        let outcome = timeout(deadline, completion).await;
        match outcome {
            Ok(finished) => {
                let (status, stdout, stderr) = finished?;
                group.disarm();
                let exit_code = status.code().unwrap_or(-1);
                let duration = started.elapsed();
                debug!(exit_code, ?duration, "Command finished");
                Ok(ProcessOutput {
                    stdout,
                    stderr,
                    exit_code,
                    duration,
                })
            }
            Err(_) => {
                warn!(?deadline, "Command timed out, terminating process group");
                group.signal(Signal::SIGTERM);
                if timeout(TERM_GRACE, child.wait()).await.is_err() {
                    debug!("Process group outlived SIGTERM grace period");
                }
                // Anything that ignored SIGTERM.
                group.signal(Signal::SIGKILL);
                group.disarm();
                if let Err(e) = child.wait().await {
                    debug!("Failed to reap timed out process: {}", e);
                }
                Err(RunError::Timeout {
                    command: cmd.to_string(),
                    timeout: deadline,
                })
            }
        }
    }
}
