// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One typed request/response pair per control-service endpoint, per
//! spec.md §6.

use crate::backoff::RetryOptions;
use crate::client::HttpClient;
use crate::error::HttpError;
use boxci_core::{BuildId, Project};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct PollRequest {
    pub n: String,
    pub v: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub m: Option<String>,
}

/// Outcome of `/get-build`: either a build to run, a stop instruction, or
/// nothing pending.
#[derive(Debug, Clone)]
pub enum GetBuildOutcome {
    Build(boxci_core::ProjectBuild),
    StopAgent,
    None,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GetBuildResponse {
    Stop { __stop__agent: bool },
    Build(Box<boxci_core::ProjectBuild>),
    Empty {},
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestRequest {
    pub v: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestResponse {
    #[serde(rename = "thisVersion")]
    pub this_version: String,
    #[serde(rename = "latestVersion")]
    pub latest_version: String,
    pub manifest: ManifestWarning,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestWarning {
    /// Warning level: 1 (info), 2 (visible warning), 3 (fatal stop).
    #[serde(default)]
    pub w: Option<u8>,
    #[serde(default)]
    pub is: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStoppedRequest {
    #[serde(rename = "projectBuildId", skip_serializing_if = "Option::is_none")]
    pub project_build_id: Option<BuildId>,
    #[serde(rename = "agentName")]
    pub agent_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetBranchRequest {
    #[serde(rename = "projectBuildId")]
    pub project_build_id: BuildId,
    #[serde(rename = "gitBranch")]
    pub git_branch: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrepareErrorRequest {
    #[serde(rename = "projectBuildId")]
    pub project_build_id: BuildId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetPipelineRequest {
    #[serde(rename = "projectBuildId")]
    pub project_build_id: BuildId,
    pub pipeline: boxci_core::ProjectBuildPipeline,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoPipelineRequest {
    #[serde(rename = "projectBuildId")]
    pub project_build_id: BuildId,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskStartedRequest {
    #[serde(rename = "projectBuildId")]
    pub project_build_id: BuildId,
    #[serde(rename = "taskIndex")]
    pub task_index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddLogsRequest {
    pub id: BuildId,
    pub i: usize,
    pub l: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddLogsResponse {
    #[serde(default)]
    pub cancelled: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskDoneRequest {
    #[serde(rename = "projectBuildId")]
    pub project_build_id: BuildId,
    #[serde(rename = "taskIndex")]
    pub task_index: usize,
    #[serde(rename = "commandReturnCode")]
    pub command_return_code: i32,
    #[serde(rename = "commandRuntimeMillis")]
    pub command_runtime_millis: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineDoneRequest {
    #[serde(rename = "projectBuildId")]
    pub project_build_id: BuildId,
    #[serde(rename = "pipelineReturnCode")]
    pub pipeline_return_code: i32,
    #[serde(rename = "pipelineRuntimeMillis")]
    pub pipeline_runtime_millis: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Empty {}

impl HttpClient {
    pub async fn get_project(&self, req: &PollRequest, opts: RetryOptions) -> Result<Project, HttpError> {
        self.post("/project", req, opts).await
    }

    pub async fn get_manifest(&self, req: &ManifestRequest, opts: RetryOptions) -> Result<ManifestResponse, HttpError> {
        self.post("/manifest", req, opts).await
    }

    pub async fn agent_stopped(&self, req: &AgentStoppedRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/agent-stopped", req, opts).await?;
        Ok(())
    }

    pub async fn get_build(&self, req: &PollRequest, opts: RetryOptions) -> Result<GetBuildOutcome, HttpError> {
        let response: GetBuildResponse = self.post("/get-build", req, opts).await?;
        Ok(match response {
            GetBuildResponse::Stop { __stop__agent } if __stop__agent => GetBuildOutcome::StopAgent,
            GetBuildResponse::Stop { .. } | GetBuildResponse::Empty {} => GetBuildOutcome::None,
            GetBuildResponse::Build(build) => GetBuildOutcome::Build(*build),
        })
    }

    pub async fn set_branch(&self, req: &SetBranchRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/set-branch", req, opts).await?;
        Ok(())
    }

    pub async fn error_clone(&self, req: &PrepareErrorRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/error-clone", req, opts).await?;
        Ok(())
    }

    pub async fn error_fetch(&self, req: &PrepareErrorRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/error-fetch", req, opts).await?;
        Ok(())
    }

    pub async fn error_prepare(&self, req: &PrepareErrorRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/error-prepare", req, opts).await?;
        Ok(())
    }

    pub async fn error_commit_not_found(&self, req: &PrepareErrorRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/error-commit-not-found", req, opts).await?;
        Ok(())
    }

    pub async fn set_pipeline(&self, req: &SetPipelineRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/set-pipeline", req, opts).await?;
        Ok(())
    }

    pub async fn no_pipeline(&self, req: &NoPipelineRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/no-pipeline", req, opts).await?;
        Ok(())
    }

    pub async fn task_started(&self, req: &TaskStartedRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/task-started", req, opts).await?;
        Ok(())
    }

    pub async fn add_logs(&self, req: &AddLogsRequest, opts: RetryOptions) -> Result<AddLogsResponse, HttpError> {
        self.post("/add-logs", req, opts).await
    }

    pub async fn task_done(&self, req: &TaskDoneRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/task-done", req, opts).await?;
        Ok(())
    }

    pub async fn pipeline_done(&self, req: &PipelineDoneRequest, opts: RetryOptions) -> Result<(), HttpError> {
        self.post::<_, Empty>("/pipeline-done", req, opts).await?;
        Ok(())
    }
}
