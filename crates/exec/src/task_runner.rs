// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns one task's shell command as a process-group leader, captures
//! combined stdout+stderr, and supports cooperative cancellation via
//! process-group signalling. See spec.md §4.7.

use boxci_core::Clock;
use boxci_journal::BuildLogger;
use parking_lot::Mutex;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::warn;

#[cfg(unix)]
use std::os::unix::process::CommandExt as _;

/// Snapshot of a task's terminal state, returned once [`TaskRunner::run`]
/// completes.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Concrete exit code, or `None` if the process was killed by a signal
    /// (the cancellation path).
    pub command_return_code: Option<i32>,
    pub runtime_ms: u64,
    pub logs: String,
    pub cancelled: bool,
    pub error_running_command: Option<String>,
}

struct Inner {
    start: Option<std::time::Instant>,
    runtime_ms: Option<u64>,
    command_return_code: Option<i32>,
    cancelled: bool,
    error_running_command: Option<String>,
    logs: String,
    #[cfg_attr(not(unix), allow(dead_code))]
    pgid: Option<i32>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            start: None,
            runtime_ms: None,
            command_return_code: None,
            cancelled: false,
            error_running_command: None,
            logs: String::new(),
            pgid: None,
        }
    }
}

/// Runs one task's shell command. Constructed once per task and shared
/// (typically behind an `Arc`) between the caller driving `run()` to
/// completion and any concurrent reader (the sync engine) inspecting
/// in-progress state via the snapshot accessors.
pub struct TaskRunner<C: Clock> {
    clock: C,
    inner: Mutex<Inner>,
}

impl<C: Clock> TaskRunner<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Spawn `command` in `cwd` with the inherited process environment
    /// plus `env`, as a new process-group leader, and drive it to
    /// completion. Safe to call only once per `TaskRunner`.
    pub async fn run(
        &self,
        command: &str,
        cwd: &Path,
        env: Vec<(String, String)>,
        logger: &BuildLogger,
    ) -> TaskOutcome {
        let start = self.clock.now();
        {
            let mut inner = self.inner.lock();
            inner.start = Some(start);
        }

        let mut cmd = shell_command(command);
        cmd.current_dir(cwd).envs(env);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = format!("failed to spawn task command: {e}");
                warn!(error = %e, command, "task spawn failed");
                let runtime_ms = elapsed_ms(&self.clock, start);
                let mut inner = self.inner.lock();
                inner.error_running_command = Some(message.clone());
                inner.runtime_ms = Some(runtime_ms);
                inner.command_return_code = Some(1);
                return TaskOutcome {
                    command_return_code: Some(1),
                    runtime_ms,
                    logs: inner.logs.clone(),
                    cancelled: false,
                    error_running_command: Some(message),
                };
            }
        };

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            self.inner.lock().pgid = Some(pid as i32);
        }

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let message = "spawned child missing piped stdout/stderr".to_string();
            warn!(command, "{message}");
            let runtime_ms = elapsed_ms(&self.clock, start);
            let mut inner = self.inner.lock();
            inner.error_running_command = Some(message.clone());
            inner.runtime_ms = Some(runtime_ms);
            inner.command_return_code = Some(1);
            return TaskOutcome {
                command_return_code: Some(1),
                runtime_ms,
                logs: inner.logs.clone(),
                cancelled: false,
                error_running_command: Some(message),
            };
        };
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();

        let mut stdout_done = false;
        let mut stderr_done = false;
        while !stdout_done || !stderr_done {
            tokio::select! {
                line = stdout_lines.next_line(), if !stdout_done => {
                    match line {
                        Ok(Some(line)) => self.append_output(&line, logger),
                        _ => stdout_done = true,
                    }
                }
                line = stderr_lines.next_line(), if !stderr_done => {
                    match line {
                        Ok(Some(line)) => self.append_output(&line, logger),
                        _ => stderr_done = true,
                    }
                }
            }
        }

        let status = child.wait().await;
        let runtime_ms = elapsed_ms(&self.clock, start);

        let mut inner = self.inner.lock();
        inner.runtime_ms = Some(runtime_ms);
        inner.command_return_code = match &status {
            Ok(status) => status.code(),
            Err(_) => None,
        };

        TaskOutcome {
            command_return_code: inner.command_return_code,
            runtime_ms,
            logs: inner.logs.clone(),
            cancelled: inner.cancelled,
            error_running_command: inner.error_running_command.clone(),
        }
    }

    fn append_output(&self, line: &str, logger: &BuildLogger) {
        let mut chunk = line.to_string();
        chunk.push('\n');
        logger.write_raw(&chunk);
        self.inner.lock().logs.push_str(&chunk);
    }

    /// Signal the task's process group. A no-op once the task has already
    /// completed (`runtime_ms` is set). Never raises.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        if inner.runtime_ms.is_some() {
            return;
        }
        inner.cancelled = true;
        #[cfg(unix)]
        if let Some(pgid) = inner.pgid {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;
            if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                warn!(pgid, error = %e, "failed to signal task process group");
            }
        }
    }

    pub fn logs_len(&self) -> usize {
        self.inner.lock().logs.len()
    }

    pub fn logs_slice(&self, from: usize) -> String {
        let inner = self.inner.lock();
        inner.logs.get(from..).unwrap_or_default().to_string()
    }

    pub fn command_return_code(&self) -> Option<i32> {
        self.inner.lock().command_return_code
    }

    pub fn runtime_ms(&self) -> Option<u64> {
        self.inner.lock().runtime_ms
    }

    pub fn cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// `true` once [`TaskRunner::run`] has been invoked, regardless of
    /// whether the task has finished yet.
    pub fn started(&self) -> bool {
        self.inner.lock().start.is_some()
    }

    pub fn error_running_command(&self) -> Option<String> {
        self.inner.lock().error_running_command.clone()
    }

    /// `true` once the task has reached a terminal state, mirroring the
    /// sync engine's "is-last-chunk" flag (spec.md §4.9 step 2).
    pub fn is_terminal(&self) -> bool {
        let inner = self.inner.lock();
        inner.runtime_ms.is_some() || inner.cancelled || inner.error_running_command.is_some()
    }
}

fn elapsed_ms<C: Clock>(clock: &C, start: std::time::Instant) -> u64 {
    clock.now().saturating_duration_since(start).as_millis() as u64
}

/// Build the command that runs `command` through the platform's default
/// shell (`/bin/sh -c` on Unix, `cmd /C` on Windows).
fn shell_command(command: &str) -> Command {
    #[cfg(unix)]
    {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command);
        cmd
    }
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    }
}

#[cfg(test)]
#[path = "task_runner_tests.rs"]
mod tests;
