// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build Runner: sequences a pipeline's tasks and owns the authoritative
//! in-memory build state the Sync Engine ships to the server. See
//! spec.md §4.8 / §9.

use boxci_core::{BuildId, Clock, ProjectBuildPipeline, TaskLogs};
use boxci_exec::{build_task_env, TaskEnvContext, TaskRunner};
use boxci_http::{HttpClient, RetryOptions, TaskDoneRequest, TaskStartedRequest};
use boxci_journal::{BuildLogger, LogLevel};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// One task's static definition plus its runner, shared between the
/// [`BuildRunner`] (which drives it) and the Sync Engine (which reads its
/// in-progress state).
pub struct TaskSlot<C: Clock> {
    pub name: String,
    pub command: String,
    pub runner: Arc<TaskRunner<C>>,
}

/// Build state shared between the Build Runner (exclusive writer of
/// `task_logs` and everything inside each [`TaskSlot`]) and the Sync
/// Engine (reader of both, exclusive writer of its own per-task sync
/// metadata — kept entirely inside `sync.rs`, not here).
pub struct SharedBuildState<C: Clock> {
    pub build_id: BuildId,
    pub tasks: Vec<TaskSlot<C>>,
    task_logs: Mutex<Vec<TaskLogs>>,
    pipeline_return_code: AtomicI32,
    pipeline_return_code_set: AtomicBool,
    pipeline_runtime_ms: Mutex<Option<u64>>,
    cancelled: AtomicBool,
}

impl<C: Clock> SharedBuildState<C> {
    pub fn new(build_id: BuildId, pipeline: &ProjectBuildPipeline, clock: C) -> Self {
        let tasks = pipeline
            .t
            .iter()
            .map(|task| TaskSlot {
                name: task.n.clone(),
                command: task.c.clone(),
                runner: Arc::new(TaskRunner::new(clock.clone())),
            })
            .collect();
        Self {
            build_id,
            tasks,
            task_logs: Mutex::new(Vec::new()),
            pipeline_return_code: AtomicI32::new(0),
            pipeline_return_code_set: AtomicBool::new(false),
            pipeline_runtime_ms: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Called by the Sync Engine when the server reports a build as
    /// cancelled via an `add-logs` response.
    pub fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn task_logs(&self) -> Vec<TaskLogs> {
        self.task_logs.lock().clone()
    }

    /// `Some((pipelineReturnCode, runtimeMs))` once the pipeline has run to
    /// a terminal state (completed or aborted on a non-zero task exit).
    /// `None` while the build is still running, or forever if it was
    /// abandoned due to cancellation.
    pub fn pipeline_outcome(&self) -> Option<(i32, u64)> {
        if !self.pipeline_return_code_set.load(Ordering::SeqCst) {
            return None;
        }
        let code = self.pipeline_return_code.load(Ordering::SeqCst);
        let runtime_ms = *self.pipeline_runtime_ms.lock();
        runtime_ms.map(|ms| (code, ms))
    }

    fn set_pipeline_done(&self, code: i32, runtime_ms: u64) {
        self.pipeline_return_code.store(code, Ordering::SeqCst);
        *self.pipeline_runtime_ms.lock() = Some(runtime_ms);
        self.pipeline_return_code_set.store(true, Ordering::SeqCst);
    }
}

/// Non-task-specific fields needed to build each task's `BOXCI_*`
/// environment (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct BuildRunnerContext<'a> {
    pub project_id: &'a str,
    pub commit: &'a str,
    pub branch: Option<&'a str>,
    pub tag: Option<&'a str>,
    pub agent_name: &'a str,
}

/// Outcome of driving a pipeline to however far it gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildRunOutcome {
    /// The pipeline ran to completion or aborted on a non-zero task exit;
    /// either way `pipeline_outcome()` is now `Some` and the Sync Engine
    /// will eventually post `pipeline-done`.
    Finalized,
    /// A task was cancelled mid-run; the build is abandoned without
    /// finalization (spec.md §4.8 step 4, §9 open question 1).
    Cancelled,
}

/// Sequences one pipeline's tasks and mutates [`SharedBuildState`] as it
/// goes. Best-effort lifecycle POSTs here exist only to reduce
/// time-to-server for the common case; the Sync Engine is the source of
/// truth for "has the server actually acknowledged it".
pub struct BuildRunner<'a> {
    http: &'a HttpClient,
}

impl<'a> BuildRunner<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    pub async fn run<C: Clock>(
        &self,
        state: &SharedBuildState<C>,
        ctx: &BuildRunnerContext<'_>,
        repo_dir: &Path,
        logger: &BuildLogger,
    ) -> BuildRunOutcome {
        let mut accumulated_runtime_ms: u64 = 0;
        let mut last_code = 0;

        for (index, slot) in state.tasks.iter().enumerate() {
            info!(build_id = %state.build_id, task = %slot.name, index, "task started");
            logger.write_event(LogLevel::Info, &format!("task {index} ({}) started", slot.name));

            let _ = self
                .http
                .task_started(
                    &TaskStartedRequest { project_build_id: state.build_id.clone(), task_index: index },
                    RetryOptions::default(),
                )
                .await;

            let env = build_task_env(&TaskEnvContext {
                project_id: ctx.project_id.to_string(),
                build_id: state.build_id.as_str().to_string(),
                task_index: index,
                task_name: slot.name.clone(),
                task_command: slot.command.clone(),
                commit: ctx.commit.to_string(),
                branch: ctx.branch.map(str::to_string),
                tag: ctx.tag.map(str::to_string),
                agent_name: ctx.agent_name.to_string(),
            });

            let outcome = slot.runner.run(&slot.command, repo_dir, env, logger).await;

            if outcome.cancelled {
                state.mark_cancelled();
                logger.write_event(LogLevel::Info, &format!("task {index} ({}) cancelled", slot.name));
                return BuildRunOutcome::Cancelled;
            }

            if let Some(error) = &outcome.error_running_command {
                logger.write_raw(&format!("boxci: failed to run task: {error}\n"));
            }

            let code = outcome.command_return_code.unwrap_or_else(|| {
                warn!(build_id = %state.build_id, task = %slot.name, "task ended with no exit code and no error");
                1
            });

            accumulated_runtime_ms += outcome.runtime_ms;
            state.task_logs.lock().push(TaskLogs {
                r: Some(code),
                t: outcome.runtime_ms,
                l: outcome.logs,
            });

            let _ = self
                .http
                .task_done(
                    &TaskDoneRequest {
                        project_build_id: state.build_id.clone(),
                        task_index: index,
                        command_return_code: code,
                        command_runtime_millis: outcome.runtime_ms,
                    },
                    RetryOptions::default(),
                )
                .await;

            last_code = code;
            if code != 0 {
                logger.write_event(LogLevel::Info, &format!("task {index} ({}) failed with code {code}, aborting pipeline", slot.name));
                break;
            }
        }

        state.set_pipeline_done(last_code, accumulated_runtime_ms);
        BuildRunOutcome::Finalized
    }
}

#[cfg(test)]
#[path = "build_runner_tests.rs"]
mod tests;
