// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the Build Preparer, Build Runner, and Sync Engine together into
//! the single call the agent's main loop makes per build (spec.md §4.10:
//! "prepare + run build (blocking)"). The Sync Engine is spawned as a
//! detached background task so it keeps flushing logs after this function
//! returns; the caller tracks the returned [`LiveSync`] in its live set and
//! evicts the build once it finishes.

use crate::build_runner::{BuildRunOutcome, BuildRunner, BuildRunnerContext, SharedBuildState};
use crate::error::EngineError;
use crate::prepare::{BuildPreparer, PrepareOutcome, PrepareRequest};
use crate::sync::{SyncEngine, DEFAULT_TICK_INTERVAL};
use boxci_core::{BuildId, Clock, ProjectBuildPipeline};
use boxci_git::GitDriver;
use boxci_http::HttpClient;
use boxci_journal::{BuildLogger, Journal, LogLevel};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Everything needed to prepare and run one build, decoupled from the wire
/// `ProjectBuild` so tests don't need a full server payload.
pub struct BuildSessionRequest<'a> {
    pub build_id: &'a BuildId,
    pub agent_name: &'a str,
    pub project_id: &'a str,
    pub git_repo_ssh_url: &'a str,
    pub git_commit: &'a str,
    pub git_branch: Option<&'a str>,
    pub git_tag: Option<&'a str>,
    pub rerun_pipeline: Option<&'a ProjectBuildPipeline>,
}

/// Outcome of one build session.
pub enum BuildSessionOutcome {
    /// Preparation failed or no pipeline matched; nothing was run.
    Skipped,
    /// A pipeline ran; carries how the Build Runner left it plus the live
    /// sync handle the caller must track.
    Ran { outcome: BuildRunOutcome, sync: LiveSync },
}

/// A sync engine running as a detached background task for one build. The
/// agent's live set holds one of these per in-flight build and prunes it
/// once [`LiveSync::is_finished`] (spec.md §4.10: "evict fully-synced
/// Build Runners from the live set").
pub struct LiveSync {
    build_id: BuildId,
    handle: tokio::task::JoinHandle<()>,
}

impl LiveSync {
    pub fn build_id(&self) -> &BuildId {
        &self.build_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// Prepare and run one build against the agent's per-agent local repo.
pub async fn run_build_session<C>(
    http: &Arc<HttpClient>,
    git: &GitDriver,
    journal: &Journal<C>,
    clock: C,
    req: &BuildSessionRequest<'_>,
    repo_dir: &Path,
    log_level: LogLevel,
) -> Result<BuildSessionOutcome, EngineError>
where
    C: Clock + 'static,
{
    journal.create_build_dir(req.build_id.as_str(), req.agent_name, req.project_id);

    let logs_dir = journal.paths().build_logs_dir(req.build_id.as_str());
    let logger = BuildLogger::open(&logs_dir, req.build_id.as_str(), log_level).map_err(|source| {
        EngineError::OpenLogger { build_id: req.build_id.as_str().to_string(), source }
    })?;

    let preparer = BuildPreparer::new(git, http);
    let prepare_req = PrepareRequest {
        build_id: req.build_id,
        git_repo_ssh_url: req.git_repo_ssh_url,
        git_commit: req.git_commit,
        git_branch: req.git_branch,
        git_tag: req.git_tag,
        rerun_pipeline: req.rerun_pipeline,
    };

    let pipeline = match preparer.prepare(repo_dir, &prepare_req, &logger).await {
        PrepareOutcome::Run(pipeline) => pipeline,
        PrepareOutcome::Skip => {
            logger.close();
            return Ok(BuildSessionOutcome::Skipped);
        }
    };

    info!(build_id = %req.build_id, pipeline = %pipeline.n, "running pipeline");

    let state = Arc::new(SharedBuildState::new(req.build_id.clone(), &pipeline, clock));
    let sync_engine = Arc::new(SyncEngine::new(Arc::clone(http), Arc::clone(&state)));

    let handle = tokio::spawn({
        let sync_engine = Arc::clone(&sync_engine);
        async move { sync_engine.run_until_settled(DEFAULT_TICK_INTERVAL).await }
    });

    let runner_ctx = BuildRunnerContext {
        project_id: req.project_id,
        commit: req.git_commit,
        branch: req.git_branch,
        tag: req.git_tag,
        agent_name: req.agent_name,
    };
    let runner = BuildRunner::new(http);
    let outcome = runner.run(&state, &runner_ctx, repo_dir, &logger).await;

    for task_log in state.task_logs() {
        journal.write_build_event(
            req.build_id.as_str(),
            serde_json::json!({"taskDone": true, "r": task_log.r, "t": task_log.t}),
        );
    }
    logger.close();

    Ok(BuildSessionOutcome::Ran { outcome, sync: LiveSync { build_id: req.build_id.clone(), handle } })
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
