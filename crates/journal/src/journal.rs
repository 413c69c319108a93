// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only on-disk event journal.
//!
//! Every write is a new `{timestamp}.json` file; nothing is ever updated in
//! place or deleted by the agent itself. Reconstruction merges a directory's
//! event files, sorted by filename, shallow-merging last writer wins.
//! Corrupt files are skipped, never fatal — only the initial directory
//! bootstrap can fail the agent outright.

use crate::paths::{JournalPaths, PathsError};
use boxci_core::{merge_events, AgentMeta, BoxCiMeta, BuildMeta, Clock};
use serde_json::{json, Value};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("cannot resolve journal paths: {0}")]
    Paths(#[from] PathsError),
    #[error("cannot bootstrap journal directories at {path}: {source}")]
    Bootstrap { path: std::path::PathBuf, source: io::Error },
}

/// Reconstructed history across the whole journal.
#[derive(Debug, Clone)]
pub struct History {
    pub box_ci: BoxCiMeta,
    pub agents: Vec<AgentMeta>,
    pub builds: Vec<BuildMeta>,
}

pub struct Journal<C: Clock> {
    paths: JournalPaths,
    clock: C,
}

impl<C: Clock> Journal<C> {
    pub fn new(paths: JournalPaths, clock: C) -> Self {
        Self { paths, clock }
    }

    pub fn paths(&self) -> &JournalPaths {
        &self.paths
    }

    /// Create the root directory layout. Fatal if it fails: the agent
    /// cannot function on this host without a writable journal root.
    pub fn bootstrap(&self) -> Result<(), JournalError> {
        for dir in [self.paths.root().to_path_buf(), self.paths.boxci_meta_dir()] {
            fs::create_dir_all(&dir).map_err(|source| JournalError::Bootstrap { path: dir, source })?;
        }
        Ok(())
    }

    /// Create the agent directory and write its initial `{p, t}` event.
    /// Best-effort: failures are logged and swallowed.
    pub fn create_agent_meta(&self, agent_name: &str, project_id: &str) {
        let dir = self.paths.agent_dir(agent_name);
        self.append_best_effort(&dir, json!({"p": project_id, "t": self.clock.epoch_ms()}));
    }

    /// Create the build directories and write the initial `{id, a, p, t}`
    /// event. Best-effort: failures are logged and swallowed.
    pub fn create_build_dir(&self, build_id: &str, agent_name: &str, project_id: &str) {
        let logs_dir = self.paths.build_logs_dir(build_id);
        if let Err(e) = fs::create_dir_all(&logs_dir) {
            warn!(build_id, error = %e, "failed to create build logs directory");
        }
        let meta_dir = self.paths.build_meta_dir(build_id);
        self.append_best_effort(
            &meta_dir,
            json!({
                "id": build_id,
                "a": agent_name,
                "p": project_id,
                "t": self.clock.epoch_ms(),
            }),
        );
    }

    /// Append a stop event for the given agent. Best-effort.
    pub fn write_agent_stopped(&self, agent_name: &str, reason: &str) {
        let dir = self.paths.agent_dir(agent_name);
        self.append_best_effort(
            &dir,
            json!({"stoppedAt": self.clock.epoch_ms(), "reason": reason}),
        );
    }

    /// Append an arbitrary event to a build's meta directory. Best-effort.
    pub fn write_build_event(&self, build_id: &str, fields: Value) {
        let dir = self.paths.build_meta_dir(build_id);
        self.append_best_effort(&dir, fields);
    }

    /// Append an arbitrary process-wide event. Best-effort.
    pub fn write_boxci_event(&self, fields: Value) {
        let dir = self.paths.boxci_meta_dir();
        self.append_best_effort(&dir, fields);
    }

    /// Reconstruct the full history: process-wide record, all agent
    /// records, all build records. Corrupt event files are skipped.
    pub fn read_history(&self) -> History {
        let box_ci = BoxCiMeta::from_merged(merge_events(self.read_dir_events(&self.paths.boxci_meta_dir())));

        let agents = self
            .paths
            .all_agent_dirs()
            .unwrap_or_default()
            .into_iter()
            .map(|dir| AgentMeta::from_merged(merge_events(self.read_dir_events(&dir))))
            .collect();

        let builds = self
            .paths
            .all_build_dirs()
            .unwrap_or_default()
            .into_iter()
            .map(|dir| BuildMeta::from_merged(merge_events(self.read_dir_events(&dir.join("meta")))))
            .collect();

        History { box_ci, agents, builds }
    }

    /// Remove only the `logs/` subtree for a build.
    pub fn delete_logs(&self, build_id: &str) {
        let dir = self.paths.build_logs_dir(build_id);
        if dir.exists() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!(build_id, error = %e, "failed to delete build logs");
            }
        }
    }

    fn append_best_effort(&self, dir: &Path, value: Value) {
        if let Err(e) = self.append(dir, value) {
            warn!(dir = %dir.display(), error = %e, "journal write failed, ignoring");
        }
    }

    /// Write a new `{timestamp}.json` (with a `-N` disambiguating suffix on
    /// same-millisecond collision) event file into `dir`.
    fn append(&self, dir: &Path, value: Value) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let ms = self.clock.epoch_ms();
        let body = serde_json::to_vec(&value)?;

        let mut suffix = 0u32;
        loop {
            let name = if suffix == 0 {
                format!("{ms:013}.json")
            } else {
                format!("{ms:013}-{suffix}.json")
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(&body)?;
                    file.sync_all()?;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    suffix += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read every `*.json` file in `dir`, skipping unreadable or corrupt
    /// entries without failing the read.
    fn read_dir_events(&self, dir: &Path) -> Vec<(String, Value)> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => return Vec::new(),
        };

        let mut out = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            match fs::read(&path).ok().and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok()) {
                Some(value) => out.push((name, value)),
                None => warn!(path = %path.display(), "skipping corrupt journal event file"),
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
