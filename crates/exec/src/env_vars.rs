// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `BOXCI_*` environment variable construction for task subprocesses.

/// Everything a task's environment needs to be built, independent of how
/// the caller sources it (agent identity, project, build, task index).
#[derive(Debug, Clone)]
pub struct TaskEnvContext {
    pub project_id: String,
    pub build_id: String,
    pub task_index: usize,
    pub task_name: String,
    pub task_command: String,
    pub commit: String,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub agent_name: String,
}

/// Build the `BOXCI_*` environment vector for one task, per spec.md §4.7.
///
/// Appended to (never replacing) the inherited process environment.
pub fn build_task_env(ctx: &TaskEnvContext) -> Vec<(String, String)> {
    let commit_short = ctx.commit.chars().take(7).collect::<String>();

    let mut env = vec![
        ("BOXCI_PROJECT".to_string(), ctx.project_id.clone()),
        ("BOXCI_PROJECT_BUILD_ID".to_string(), ctx.build_id.clone()),
        ("BOXCI_TASK_INDEX".to_string(), ctx.task_index.to_string()),
        ("BOXCI_TASK_NAME".to_string(), ctx.task_name.clone()),
        ("BOXCI_TASK_COMMAND".to_string(), ctx.task_command.clone()),
        ("BOXCI_COMMIT".to_string(), ctx.commit.clone()),
        ("BOXCI_COMMIT_SHORT".to_string(), commit_short),
        ("BOXCI_AGENT_NAME".to_string(), ctx.agent_name.clone()),
    ];

    if let Some(branch) = &ctx.branch {
        env.push(("BOXCI_BRANCH".to_string(), branch.clone()));
    }
    if let Some(tag) = &ctx.tag {
        env.push(("BOXCI_TAG".to_string(), tag.clone()));
    }

    env
}
