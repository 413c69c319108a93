// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build, task, pipeline, and config data model.

use crate::{AgentName, BuildId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A unit of work served by the control service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectBuild {
    pub id: BuildId,
    #[serde(rename = "gitCommit")]
    pub git_commit: String,
    #[serde(rename = "agentName")]
    pub agent_name: AgentName,
    #[serde(rename = "gitTag", default, skip_serializing_if = "Option::is_none")]
    pub git_tag: Option<String>,
    #[serde(rename = "gitBranch", default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    /// Present on reruns; short-circuits pipeline resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<ProjectBuildPipeline>,
    #[serde(rename = "rerunId", default, skip_serializing_if = "Option::is_none")]
    pub rerun_id: Option<String>,
    #[serde(rename = "startedAt", default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(rename = "timedOut", default)]
    pub timed_out: bool,
    #[serde(rename = "taskLogs", default)]
    pub task_logs: Vec<TaskLogs>,
}

impl ProjectBuild {
    /// `gitTag` if present, else `gitBranch` — the build's ref.
    pub fn git_ref(&self) -> Option<&str> {
        self.git_tag.as_deref().or(self.git_branch.as_deref())
    }

    /// A build is valid iff `id` matches the 12-char `B…` format, `gitCommit`
    /// is non-empty, `agentName` equals `this_agent`, and neither
    /// `cancelled` nor `timedOut` is true.
    pub fn is_valid(&self, this_agent: &AgentName) -> bool {
        self.id.is_valid()
            && !self.git_commit.is_empty()
            && self.agent_name == *this_agent
            && !self.cancelled
            && !self.timed_out
    }
}

/// A single task: a name and a verbatim shell command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBuildTask {
    pub n: String,
    pub c: String,
}

/// An ordered, non-empty sequence of tasks selected for a build's ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBuildPipeline {
    pub n: String,
    pub t: Vec<ProjectBuildTask>,
}

/// The parsed and validated `boxci.json`/`.yml`/`.yaml` build config.
///
/// `pipelines` preserves source declaration order — required for pipeline
/// matching, which iterates pipelines in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectBuildConfig {
    pub tasks: IndexMap<String, String>,
    pub pipelines: IndexMap<String, Vec<String>>,
}

impl ProjectBuildConfig {
    /// Resolve a pipeline name into a fully materialized `ProjectBuildPipeline`.
    ///
    /// Returns `None` if the pipeline name is unknown (should not happen for
    /// a config that has already passed validation).
    pub fn resolve(&self, pipeline_name: &str) -> Option<ProjectBuildPipeline> {
        let task_names = self.pipelines.get(pipeline_name)?;
        let tasks = task_names
            .iter()
            .map(|name| {
                self.tasks.get(name).map(|command| ProjectBuildTask {
                    n: name.clone(),
                    c: command.clone(),
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(ProjectBuildPipeline {
            n: pipeline_name.to_string(),
            t: tasks,
        })
    }
}

/// Per-task record appended to the build as each task completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLogs {
    pub r: Option<i32>,
    pub t: u64,
    pub l: String,
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
