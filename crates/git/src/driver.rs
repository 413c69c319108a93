// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin wrapper around `git` command-line invocations.

use boxci_journal::{BuildLogger, LogLevel};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

/// Bounds how long any single `git` invocation may run before it is killed.
///
/// The spec is silent on git timeouts, but §1's "does not attempt to resume
/// a build interrupted mid-execution" non-goal implies the agent should not
/// wedge forever on a hung `git fetch` either. Matches the teacher's
/// `GIT_WORKTREE_TIMEOUT` (60s).
pub const GIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Thin command wrapper over `git`, bound to a working directory that may
/// be changed via [`GitDriver::set_cwd`].
pub struct GitDriver {
    git_binary: PathBuf,
    cwd: Mutex<PathBuf>,
    timeout: Duration,
}

impl GitDriver {
    /// Construct a driver rooted at `initial_cwd`, using `git` from `PATH`.
    pub fn new(initial_cwd: impl Into<PathBuf>) -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            cwd: Mutex::new(initial_cwd.into()),
            timeout: GIT_TIMEOUT,
        }
    }

    pub fn cwd(&self) -> PathBuf {
        self.cwd.lock().clone()
    }

    /// Change the working directory used by subsequent commands.
    pub fn set_cwd(&self, dir: impl Into<PathBuf>) {
        *self.cwd.lock() = dir.into();
    }

    /// `git --version`, parsed to just the version string on success.
    pub async fn version(&self) -> Option<String> {
        let output = self.run_in(&self.cwd(), &["--version"], None).await?;
        String::from_utf8(output.stdout)
            .ok()
            .map(|s| s.trim().to_string())
    }

    /// `git rev-parse --abbrev-ref HEAD`, `None` on detached HEAD or failure.
    pub async fn get_branch(&self, logger: Option<&BuildLogger>) -> Option<String> {
        let output = self
            .run_in(&self.cwd(), &["rev-parse", "--abbrev-ref", "HEAD"], logger)
            .await?;
        let branch = String::from_utf8(output.stdout).ok()?.trim().to_string();
        if branch.is_empty() || branch == "HEAD" {
            None
        } else {
            Some(branch)
        }
    }

    /// `git rev-parse HEAD`.
    pub async fn get_commit(&self, logger: Option<&BuildLogger>) -> Option<String> {
        let output = self.run_in(&self.cwd(), &["rev-parse", "HEAD"], logger).await?;
        let commit = String::from_utf8(output.stdout).ok()?.trim().to_string();
        if commit.is_empty() {
            None
        } else {
            Some(commit)
        }
    }

    /// Local branches containing `commit`, via `git branch --contains`.
    ///
    /// Empty on failure or when no local branch contains the commit.
    pub async fn branches_for_commit(&self, commit: &str, logger: Option<&BuildLogger>) -> Vec<String> {
        let Some(output) = self
            .run_in(&self.cwd(), &["branch", "--contains", commit], logger)
            .await
        else {
            return Vec::new();
        };
        let Ok(text) = String::from_utf8(output.stdout) else {
            return Vec::new();
        };
        text.lines()
            .map(|line| line.trim_start_matches('*').trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// `git clone <url> <dest>`. Returns `true` on success.
    pub async fn clone(&self, url: &str, dest: &Path, logger: Option<&BuildLogger>) -> bool {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        self.run_in(
            parent,
            &["clone", url, &dest.display().to_string()],
            logger,
        )
        .await
        .is_some()
    }

    /// `git fetch` in the current working directory. Returns `true` on success.
    pub async fn fetch_in_cwd(&self, logger: Option<&BuildLogger>) -> bool {
        self.run_in(&self.cwd(), &["fetch", "--all", "--tags", "--force"], logger)
            .await
            .is_some()
    }

    /// `git checkout <commit>`. Returns `true` on success.
    pub async fn checkout(&self, commit: &str, logger: Option<&BuildLogger>) -> bool {
        self.run_in(&self.cwd(), &["checkout", commit], logger)
            .await
            .is_some()
    }

    async fn run_in(&self, dir: &Path, args: &[&str], logger: Option<&BuildLogger>) -> Option<Output> {
        let mut cmd = Command::new(&self.git_binary);
        cmd.current_dir(dir).args(args);

        let description = format!("git {}", args.join(" "));
        let result = tokio::time::timeout(self.timeout, cmd.output()).await;

        match result {
            Ok(Ok(output)) if output.status.success() => Some(output),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(command = %description, stderr = %stderr, "git command failed");
                if let Some(logger) = logger {
                    logger.write_event(LogLevel::Error, &format!("{description}: {stderr}"));
                }
                None
            }
            Ok(Err(e)) => {
                warn!(command = %description, error = %e, "git command could not be spawned");
                if let Some(logger) = logger {
                    logger.write_event(LogLevel::Error, &format!("{description}: {e}"));
                }
                None
            }
            Err(_) => {
                warn!(command = %description, timeout_secs = self.timeout.as_secs(), "git command timed out");
                if let Some(logger) = logger {
                    logger.write_event(
                        LogLevel::Error,
                        &format!("{description}: timed out after {}s", self.timeout.as_secs()),
                    );
                }
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
