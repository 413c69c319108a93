// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync Engine: periodically ships per-task lifecycle and log events to the
//! control service using monotonic offsets, independent of whether the
//! build itself is still executing. See spec.md §4.9 / §9.

use crate::build_runner::SharedBuildState;
use boxci_core::{BuildId, Clock};
use boxci_http::{
    AddLogsRequest, HttpClient, PipelineDoneRequest, RetryOptions, TaskDoneRequest, TaskStartedRequest,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default interval between sync ticks (spec.md §4.9: "≈5s").
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Per-task sync bookkeeping, owned exclusively by the [`SyncEngine`].
/// Plain atomics rather than a lock: the tick-exclusion lock already
/// guarantees at most one tick reads or writes these at a time, so no
/// additional synchronization is needed within a tick.
#[derive(Default)]
struct TaskSyncState {
    logs_sent_pointer: AtomicUsize,
    task_started_synced: AtomicBool,
    logs_synced: AtomicBool,
    task_done_synced: AtomicBool,
}

/// Outcome of one [`SyncEngine::tick`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick ran to completion.
    Ran,
    /// Another tick was already in flight; this one was skipped rather
    /// than queued (spec.md §8 invariant 3: ticks never overlap).
    Skipped,
}

/// Ships `task-started`, incremental `logs`, `task-done`, and final
/// `pipeline-done` events for one build, reading [`SharedBuildState`] and
/// owning its own per-task `logsSentPointer`/`synced` bookkeeping.
///
/// Holds `Arc`s rather than borrows so an engine can be wrapped in its own
/// `Arc` and handed to `tokio::spawn` as a detached background task that
/// outlives the build's synchronous execution (spec.md §4.9: "periodic
/// background task").
pub struct SyncEngine<C: Clock> {
    http: Arc<HttpClient>,
    state: Arc<SharedBuildState<C>>,
    task_sync: Vec<TaskSyncState>,
    pipeline_synced: AtomicBool,
    tick_lock: tokio::sync::Mutex<()>,
}

impl<C: Clock> SyncEngine<C> {
    pub fn new(http: Arc<HttpClient>, state: Arc<SharedBuildState<C>>) -> Self {
        let task_sync = state.tasks.iter().map(|_| TaskSyncState::default()).collect();
        Self {
            http,
            state,
            task_sync,
            pipeline_synced: AtomicBool::new(false),
            tick_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// `true` once `pipeline-done` has been acknowledged, or the build was
    /// abandoned via cancellation and every task that had started has had
    /// its logs fully flushed — i.e. there is nothing further this engine
    /// can usefully do.
    pub fn is_settled(&self) -> bool {
        if self.pipeline_synced.load(Ordering::SeqCst) {
            return true;
        }
        self.state.is_cancelled() && self.all_started_tasks_logs_synced()
    }

    pub fn is_pipeline_synced(&self) -> bool {
        self.pipeline_synced.load(Ordering::SeqCst)
    }

    pub fn build_id(&self) -> &BuildId {
        &self.state.build_id
    }

    /// Run one sync iteration. Returns [`TickOutcome::Skipped`] if another
    /// tick is already in flight rather than blocking for it — a missed
    /// tick is made up by the next one.
    pub async fn tick(&self) -> TickOutcome {
        let Ok(_guard) = self.tick_lock.try_lock() else {
            return TickOutcome::Skipped;
        };

        for (index, slot) in self.state.tasks.iter().enumerate() {
            self.sync_task(index, slot.runner.as_ref(), &self.task_sync[index]).await;
        }

        if !self.pipeline_synced.load(Ordering::SeqCst) {
            if let Some((code, runtime_ms)) = self.state.pipeline_outcome() {
                if self.all_started_tasks_synced() {
                    let result = self
                        .http
                        .pipeline_done(
                            &PipelineDoneRequest {
                                project_build_id: self.state.build_id.clone(),
                                pipeline_return_code: code,
                                pipeline_runtime_millis: runtime_ms,
                            },
                            RetryOptions::default(),
                        )
                        .await;
                    match result {
                        Ok(()) => self.pipeline_synced.store(true, Ordering::SeqCst),
                        Err(e) => warn!(build_id = %self.state.build_id, error = %e, "pipeline-done post failed, retrying next tick"),
                    }
                }
            }
        }

        TickOutcome::Ran
    }

    /// Tick on `interval` until [`Self::is_settled`]. Intended to be
    /// spawned as a background task per build; the caller tracks its
    /// `JoinHandle` in the agent's live set and evicts the build once the
    /// task finishes.
    pub async fn run_until_settled(self: Arc<Self>, interval: Duration) {
        while !self.is_settled() {
            self.tick().await;
            if self.is_settled() {
                break;
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn sync_task(&self, index: usize, runner: &boxci_exec::TaskRunner<C>, sync: &TaskSyncState) {
        if runner.started() && !sync.task_started_synced.load(Ordering::SeqCst) {
            let result = self
                .http
                .task_started(
                    &TaskStartedRequest { project_build_id: self.state.build_id.clone(), task_index: index },
                    RetryOptions::default(),
                )
                .await;
            if result.is_ok() {
                sync.task_started_synced.store(true, Ordering::SeqCst);
            }
        }

        if !sync.logs_synced.load(Ordering::SeqCst) {
            let from = sync.logs_sent_pointer.load(Ordering::SeqCst);
            let new_logs = runner.logs_slice(from);
            let snapshot_len = runner.logs_len();
            let is_last_chunk = runner.is_terminal();

            let result = self
                .http
                .add_logs(
                    &AddLogsRequest { id: self.state.build_id.clone(), i: index, l: new_logs },
                    RetryOptions::default(),
                )
                .await;

            match result {
                Ok(resp) => {
                    sync.logs_sent_pointer.store(snapshot_len, Ordering::SeqCst);
                    if is_last_chunk {
                        sync.logs_synced.store(true, Ordering::SeqCst);
                    }
                    if resp.cancelled.unwrap_or(false) {
                        runner.cancel();
                        self.state.mark_cancelled();
                    }
                }
                Err(e) => {
                    warn!(build_id = %self.state.build_id, index, error = %e, "add-logs post failed, retrying next tick");
                }
            }
        }

        if sync.logs_synced.load(Ordering::SeqCst) && !sync.task_done_synced.load(Ordering::SeqCst) {
            if let Some(code) = runner.command_return_code() {
                let result = self
                    .http
                    .task_done(
                        &TaskDoneRequest {
                            project_build_id: self.state.build_id.clone(),
                            task_index: index,
                            command_return_code: code,
                            command_runtime_millis: runner.runtime_ms().unwrap_or(0),
                        },
                        RetryOptions::default(),
                    )
                    .await;
                if result.is_ok() {
                    sync.task_done_synced.store(true, Ordering::SeqCst);
                }
            }
        }
    }

    /// A task that never started is vacuously synced — it cannot block
    /// `pipeline-done` after a pipeline aborts early on a failing task.
    fn all_started_tasks_synced(&self) -> bool {
        self.state
            .tasks
            .iter()
            .zip(self.task_sync.iter())
            .all(|(slot, sync)| !slot.runner.started() || sync.task_done_synced.load(Ordering::SeqCst))
    }

    fn all_started_tasks_logs_synced(&self) -> bool {
        self.state
            .tasks
            .iter()
            .zip(self.task_sync.iter())
            .all(|(slot, sync)| !slot.runner.started() || sync.logs_synced.load(Ordering::SeqCst))
    }

    /// Exposed for tests asserting `logsSentPointer` monotonicity directly.
    #[cfg(test)]
    fn logs_sent_pointer(&self, index: usize) -> usize {
        self.task_sync[index].logs_sent_pointer.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
