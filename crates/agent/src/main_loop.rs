// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent Main Loop (C10): startup, then the poll/dispatch loop. See
//! spec.md §4.10.

use crate::config::AgentConfig;
use boxci_core::{Clock, IdGen, RandomIdGen};
use boxci_engine::{run_build_session, BuildSessionRequest, BuildSessionOutcome, LiveSync};
use boxci_git::GitDriver;
use boxci_http::{
    AgentStoppedRequest, GetBuildOutcome, HttpClient, ManifestRequest, PollRequest, RetryOptions,
};
use boxci_journal::{Journal, LogLevel};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// This crate's own version, reported to the control service and compared
/// against the server's manifest.
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often the main loop re-checks the CLI version against the server's
/// manifest (spec.md §4.10: "every Nth iteration (default 8)").
pub const VERSION_RECHECK_INTERVAL: u64 = 8;

/// Nominal poll interval; each iteration sleeps half of this after
/// dispatching, and a full half again when there was nothing to do
/// (spec.md §4.10 pseudocode).
pub const HALF_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Terminal outcome of [`run_agent`]. Kept distinct from
/// [`std::process::ExitCode`] so tests can assert on it directly; `main.rs`
/// maps it to the process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// Cooperative stop (local stop file) or server-requested stop.
    Stopped { reason: &'static str },
    /// A fatal condition per spec.md §7: bad credentials, an unsupported
    /// version, or an unusable journal root.
    Fatal { reason: &'static str },
}

impl AgentOutcome {
    pub fn exit_code(&self) -> std::process::ExitCode {
        match self {
            AgentOutcome::Stopped { .. } => std::process::ExitCode::SUCCESS,
            AgentOutcome::Fatal { .. } => std::process::ExitCode::FAILURE,
        }
    }
}

/// Everything the main loop needs beyond the resolved [`AgentConfig`],
/// assembled by `main.rs` from real system resources (or by tests from
/// fakes) — same "pass the pieces, not a god object" shape as
/// `boxci_engine::run_build_session`. `git`'s working directory is
/// repointed at the per-agent repo once the agent name is known, since the
/// name (and so the repo path) isn't generated until [`run_agent`] starts.
pub struct AgentRuntime<C: Clock> {
    pub http: Arc<HttpClient>,
    pub journal: Journal<C>,
    pub git: GitDriver,
    pub clock: C,
}

/// Run the agent to completion: startup, then poll/dispatch until a stop
/// condition is reached.
pub async fn run_agent<C>(config: AgentConfig, runtime: AgentRuntime<C>) -> AgentOutcome
where
    C: Clock + 'static,
{
    let AgentRuntime { http, journal, git, clock } = runtime;

    if let Err(e) = journal.bootstrap() {
        error!(error = %e, "cannot bootstrap journal, agent cannot start");
        return AgentOutcome::Fatal { reason: "bootstrap-failed" };
    }

    let agent_name = RandomIdGen.agent_name();
    journal.create_agent_meta(agent_name.as_str(), config.project_id.as_str());

    let repo_dir = journal.paths().agent_repo_dir(agent_name.as_str());
    git.set_cwd(repo_dir.clone());
    let stop_file = journal.paths().root().join("stop");

    if config.using_test_service() {
        warn!(service = %config.service, "using test service");
    }

    let poll_req = PollRequest {
        n: agent_name.as_str().to_string(),
        v: AGENT_VERSION.to_string(),
        m: config.machine_name.clone(),
    };

    let mut project = match http.get_project(&poll_req, RetryOptions::default()).await {
        Ok(project) => project,
        Err(boxci_http::HttpError::FatalAuth { status }) => {
            return fatal_auth_outcome(status, &agent_name, &journal);
        }
        Err(e) => {
            journal.write_agent_stopped(agent_name.as_str(), "unreachable-service");
            error!(error = %e, "could not fetch project binding at startup");
            return AgentOutcome::Fatal { reason: "unreachable-service" };
        }
    };
    project.apply_ssh_host_rewrite(config.ssh_host.as_deref());

    if let Some(outcome) = check_version(&http, &agent_name, &journal).await {
        return outcome;
    }

    let mut live: Vec<LiveSync> = Vec::new();
    let mut iteration: u64 = 0;

    loop {
        live.retain(|s| !s.is_finished());

        iteration += 1;
        if iteration % VERSION_RECHECK_INTERVAL == 0 {
            if let Some(outcome) = check_version(&http, &agent_name, &journal).await {
                return outcome;
            }
        }

        if stop_file.exists() {
            journal.write_agent_stopped(agent_name.as_str(), "stopped-from-cli");
            info!("stop file observed, exiting");
            return AgentOutcome::Stopped { reason: "stopped-from-cli" };
        }

        match http.get_build(&poll_req, RetryOptions::default()).await {
            Ok(GetBuildOutcome::StopAgent) => {
                let _ = http
                    .agent_stopped(
                        &AgentStoppedRequest { project_build_id: None, agent_name: agent_name.as_str().to_string() },
                        RetryOptions::default(),
                    )
                    .await;
                journal.write_agent_stopped(agent_name.as_str(), "stopped-from-app");
                info!("server requested stop");
                return AgentOutcome::Stopped { reason: "stopped-from-app" };
            }
            Ok(GetBuildOutcome::Build(build)) if build.is_valid(&agent_name) => {
                info!(build_id = %build.id, "dispatching build");
                let req = BuildSessionRequest {
                    build_id: &build.id,
                    agent_name: agent_name.as_str(),
                    project_id: config.project_id.as_str(),
                    git_repo_ssh_url: &project.git_repo_ssh_url,
                    git_commit: &build.git_commit,
                    git_branch: build.git_branch.as_deref(),
                    git_tag: build.git_tag.as_deref(),
                    rerun_pipeline: build.pipeline.as_ref(),
                };
                match run_build_session(&http, &git, &journal, clock.clone(), &req, &repo_dir, LogLevel::Info).await {
                    Ok(BuildSessionOutcome::Ran { sync, .. }) => live.push(sync),
                    Ok(BuildSessionOutcome::Skipped) => {}
                    Err(e) => error!(build_id = %build.id, error = %e, "failed to open build session"),
                }
            }
            Ok(GetBuildOutcome::Build(_)) => {
                warn!("server returned an invalid build, skipping");
            }
            Ok(GetBuildOutcome::None) => {
                tokio::time::sleep(HALF_POLL_INTERVAL).await;
            }
            Err(boxci_http::HttpError::FatalAuth { status }) => {
                return fatal_auth_outcome(status, &agent_name, &journal);
            }
            Err(e) => {
                warn!(error = %e, "get-build poll failed, will retry next iteration");
            }
        }

        tokio::time::sleep(HALF_POLL_INTERVAL).await;
    }
}

/// Journal and log a fatal-auth outcome for any control-service call that
/// came back 401 or 403, per spec.md §4.2/§7: 401 is `invalid-creds`, 403 is
/// `invalid-config`. Shared by every call site since the fatal-auth
/// contract applies to all control-service calls, not just `/project`.
fn fatal_auth_outcome<C: Clock>(
    status: u16,
    agent_name: &boxci_core::AgentName,
    journal: &Journal<C>,
) -> AgentOutcome {
    let reason = if status == 403 { "invalid-config" } else { "invalid-creds" };
    journal.write_agent_stopped(agent_name.as_str(), reason);
    error!(status, reason, "control service rejected credentials");
    AgentOutcome::Fatal { reason }
}

/// Check the server's manifest. Returns `Some(outcome)` when the agent must
/// stop (level-3 warning is fatal per spec.md §7); `None` to continue.
async fn check_version<C: Clock>(
    http: &HttpClient,
    agent_name: &boxci_core::AgentName,
    journal: &Journal<C>,
) -> Option<AgentOutcome> {
    let resp = match http.get_manifest(&ManifestRequest { v: AGENT_VERSION.to_string() }, RetryOptions::default()).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!(error = %e, "manifest check failed, continuing");
            return None;
        }
    };

    match resp.manifest.w {
        Some(3) => {
            journal.write_agent_stopped(agent_name.as_str(), "unsupported-version");
            let issues = resp.manifest.is.unwrap_or_default().join(", ");
            error!(this_version = %resp.this_version, latest_version = %resp.latest_version, issues, "unsupported agent version");
            Some(AgentOutcome::Fatal { reason: "unsupported-version" })
        }
        Some(level) if level == 1 || level == 2 => {
            warn!(this_version = %resp.this_version, latest_version = %resp.latest_version, "version warning from control service");
            None
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "main_loop_tests.rs"]
mod tests;
