// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build Preparer: the clone/fetch/checkout/config/pipeline-match state
//! machine run once per build, before any task executes. See spec.md §4.6.

use boxci_config::{load_config, select_pipeline};
use boxci_core::{BuildId, ProjectBuildPipeline};
use boxci_git::GitDriver;
use boxci_http::{
    HttpClient, NoPipelineRequest, PrepareErrorRequest, RetryOptions, SetBranchRequest, SetPipelineRequest,
};

pub use boxci_http::RetryOptions as PrepareRetryOptions;
use boxci_journal::BuildLogger;
use std::path::Path;
use tracing::{info, warn};

/// What to do with the build after preparation.
#[derive(Debug, Clone)]
pub enum PrepareOutcome {
    /// A pipeline was resolved (fresh match or carried over from a rerun);
    /// the Build Runner should execute it.
    Run(ProjectBuildPipeline),
    /// Preparation failed, or no pipeline matched the build's ref; the
    /// build is skipped and the agent resumes polling.
    Skip,
}

/// One input bundle describing the build under preparation, decoupled from
/// the wire `ProjectBuild` so tests don't need a full server payload.
pub struct PrepareRequest<'a> {
    pub build_id: &'a BuildId,
    pub git_repo_ssh_url: &'a str,
    pub git_commit: &'a str,
    pub git_branch: Option<&'a str>,
    pub git_tag: Option<&'a str>,
    pub rerun_pipeline: Option<&'a ProjectBuildPipeline>,
}

/// Runs the clone/fetch/checkout/config/pipeline-match state machine over
/// one agent's local `repo/` directory.
pub struct BuildPreparer<'a> {
    git: &'a GitDriver,
    http: &'a HttpClient,
}

impl<'a> BuildPreparer<'a> {
    pub fn new(git: &'a GitDriver, http: &'a HttpClient) -> Self {
        Self { git, http }
    }

    /// Run preparation against `repo_dir`, the agent's per-agent local repo.
    pub async fn prepare(
        &self,
        repo_dir: &Path,
        req: &PrepareRequest<'_>,
        logger: &BuildLogger,
    ) -> PrepareOutcome {
        if !repo_dir.join(".git").is_dir() {
            info!(build_id = %req.build_id, "cloning agent repo");
            if !self.git.clone(req.git_repo_ssh_url, repo_dir, Some(logger)).await {
                self.report_error(self.http.error_clone(&self.error_body(req), RetryOptions::default())).await;
                return PrepareOutcome::Skip;
            }
        }

        self.git.set_cwd(repo_dir);

        if !self.git.fetch_in_cwd(Some(logger)).await {
            self.report_error(self.http.error_fetch(&self.error_body(req), RetryOptions::default())).await;
            return PrepareOutcome::Skip;
        }

        if !self.git.checkout(req.git_commit, Some(logger)).await {
            self.report_error(self.http.error_commit_not_found(&self.error_body(req), RetryOptions::default())).await;
            return PrepareOutcome::Skip;
        }

        let adopted_branch = self.adopt_branch_if_missing(req, logger).await;
        let git_ref = req.git_tag.or(req.git_branch).or(adopted_branch.as_deref());

        if let Some(pipeline) = req.rerun_pipeline {
            return PrepareOutcome::Run(pipeline.clone());
        }

        let config = match load_config(repo_dir) {
            Ok(config) => config,
            Err(e) => {
                warn!(build_id = %req.build_id, error = %e, "build config invalid");
                self.report_error(self.http.error_prepare(
                    &PrepareErrorRequest {
                        project_build_id: req.build_id.clone(),
                        message: Some(e.to_string()),
                    },
                    RetryOptions::default(),
                ))
                .await;
                return PrepareOutcome::Skip;
            }
        };

        let Some(pipeline_name) = select_pipeline(&config, git_ref.unwrap_or_default()) else {
            let _ = self
                .http
                .no_pipeline(&NoPipelineRequest { project_build_id: req.build_id.clone() }, RetryOptions::default())
                .await;
            return PrepareOutcome::Skip;
        };

        let Some(pipeline) = config.resolve(pipeline_name) else {
            // Validated config guarantees every pipeline name resolves; this
            // branch exists only to keep resolve()'s Option honest.
            let _ = self
                .http
                .no_pipeline(&NoPipelineRequest { project_build_id: req.build_id.clone() }, RetryOptions::default())
                .await;
            return PrepareOutcome::Skip;
        };

        let _ = self
            .http
            .set_pipeline(
                &SetPipelineRequest { project_build_id: req.build_id.clone(), pipeline: pipeline.clone() },
                RetryOptions::default(),
            )
            .await;

        PrepareOutcome::Run(pipeline)
    }

    /// If the build carries no branch, and exactly one local branch contains
    /// the checked-out commit, adopt and report it (best-effort, non-fatal).
    async fn adopt_branch_if_missing(&self, req: &PrepareRequest<'_>, logger: &BuildLogger) -> Option<String> {
        if req.git_branch.is_some_and(|b| !b.is_empty()) {
            return None;
        }
        let branches = self.git.branches_for_commit(req.git_commit, Some(logger)).await;
        let [only] = branches.as_slice() else {
            return None;
        };
        let _ = self
            .http
            .set_branch(
                &SetBranchRequest { project_build_id: req.build_id.clone(), git_branch: only.clone() },
                RetryOptions::default(),
            )
            .await;
        Some(only.clone())
    }

    fn error_body(&self, req: &PrepareRequest<'_>) -> PrepareErrorRequest {
        PrepareErrorRequest { project_build_id: req.build_id.clone(), message: None }
    }

    async fn report_error<F>(&self, fut: F)
    where
        F: std::future::Future<Output = Result<(), boxci_http::HttpError>>,
    {
        if let Err(e) = fut.await {
            warn!(error = %e, "failed to report preparation error to control service");
        }
    }
}

#[cfg(test)]
#[path = "prepare_tests.rs"]
mod tests;
