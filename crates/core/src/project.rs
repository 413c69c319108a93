// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project: the server-side entity an agent is bound to.

use crate::ProjectId;
use serde::{Deserialize, Serialize};

/// Source control host that owns the project's repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoType {
    GitHub,
    GitLab,
    Bitbucket,
    Other,
}

/// Project binding fetched from the control service at agent startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "projectId")]
    pub project_id: ProjectId,
    #[serde(rename = "gitRepoSshUrl")]
    pub git_repo_ssh_url: String,
    #[serde(rename = "repoType")]
    pub repo_type: RepoType,
}

impl Project {
    /// Rewrite `github.com` in the repo's ssh url to `ssh_host`, once, only
    /// for GitHub-hosted projects.
    ///
    /// No-op for non-GitHub projects or when `ssh_host` is `None`.
    pub fn apply_ssh_host_rewrite(&mut self, ssh_host: Option<&str>) {
        let Some(ssh_host) = ssh_host else {
            return;
        };
        if self.repo_type != RepoType::GitHub {
            return;
        }
        self.git_repo_ssh_url = self.git_repo_ssh_url.replacen("github.com", ssh_host, 1);
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
