// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal directory layout rooted at the user's home directory.
//!
//! ```text
//! .boxci/
//!   b/<buildId>/logs/                raw+events log files
//!   b/<buildId>/meta/                append-only {timestamp}.json event files
//!   meta/boxci/                      process-wide events
//!   meta/agent/<agentName>/          per-agent events; repo at .../repo
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathsError {
    #[error("cannot determine user home directory")]
    NoHomeDir,
}

/// Resolved journal directory layout.
#[derive(Debug, Clone)]
pub struct JournalPaths {
    root: PathBuf,
}

impl JournalPaths {
    /// Resolve the journal root, honoring `BOXCI_HOME` for test isolation,
    /// falling back to `<userHome>/.boxci` (`<userHome>/AppData/boxci` on
    /// Windows).
    pub fn resolve() -> Result<Self, PathsError> {
        if let Ok(dir) = std::env::var("BOXCI_HOME") {
            return Ok(Self { root: PathBuf::from(dir) });
        }

        let home = dirs::home_dir().ok_or(PathsError::NoHomeDir)?;
        let root = if cfg!(windows) {
            home.join("AppData").join("boxci")
        } else {
            home.join(".boxci")
        };
        Ok(Self { root })
    }

    /// Construct a journal layout rooted at an explicit path, bypassing
    /// home-directory resolution. Used by tests for isolation.
    pub fn resolve_at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn build_dir(&self, build_id: &str) -> PathBuf {
        self.root.join("b").join(build_id)
    }

    pub fn build_logs_dir(&self, build_id: &str) -> PathBuf {
        self.build_dir(build_id).join("logs")
    }

    pub fn build_meta_dir(&self, build_id: &str) -> PathBuf {
        self.build_dir(build_id).join("meta")
    }

    pub fn boxci_meta_dir(&self) -> PathBuf {
        self.root.join("meta").join("boxci")
    }

    pub fn agent_dir(&self, agent_name: &str) -> PathBuf {
        self.root.join("meta").join("agent").join(agent_name)
    }

    pub fn agent_repo_dir(&self, agent_name: &str) -> PathBuf {
        self.agent_dir(agent_name).join("repo")
    }

    pub fn all_build_dirs(&self) -> std::io::Result<Vec<PathBuf>> {
        let dir = self.root.join("b");
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                out.push(entry.path());
            }
        }
        Ok(out)
    }

    pub fn all_agent_dirs(&self) -> std::io::Result<Vec<PathBuf>> {
        let dir = self.root.join("meta").join("agent");
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                out.push(entry.path());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
