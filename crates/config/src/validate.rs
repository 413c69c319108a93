// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-config validation: accumulate every violation rather than
//! short-circuiting on the first, per spec.md §4.5.

use boxci_core::ProjectBuildConfig;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Loosely-typed config document, deserialized from either JSON or YAML.
///
/// Values are kept as `serde_json::Value` so type violations (a task whose
/// command isn't a string, a pipeline whose entry isn't an array of
/// strings) can be reported individually rather than aborting the parse.
#[derive(Debug, Deserialize)]
pub(crate) struct RawConfig {
    pub tasks: Option<IndexMap<String, Value>>,
    pub pipelines: Option<IndexMap<String, Value>>,
}

/// Validate a [`RawConfig`], collecting every violation found.
///
/// Returns the fully-typed [`ProjectBuildConfig`] iff there are no
/// violations.
pub(crate) fn validate(raw: RawConfig) -> Result<ProjectBuildConfig, Vec<String>> {
    let mut errors = Vec::new();

    let tasks = match raw.tasks {
        None => {
            errors.push("missing required `tasks` key".to_string());
            None
        }
        Some(map) if map.is_empty() => {
            errors.push("`tasks` must be a non-empty mapping".to_string());
            None
        }
        Some(map) => {
            let mut tasks = IndexMap::new();
            for (name, value) in map {
                match value.as_str() {
                    Some(command) => {
                        tasks.insert(name, command.to_string());
                    }
                    None => errors.push(format!("task `{name}`'s command must be a string")),
                }
            }
            Some(tasks)
        }
    };

    let pipelines = match raw.pipelines {
        None => {
            errors.push("missing required `pipelines` key".to_string());
            None
        }
        Some(map) if map.is_empty() => {
            errors.push("`pipelines` must be a non-empty mapping".to_string());
            None
        }
        Some(map) => {
            let mut pipelines = IndexMap::new();
            for (name, value) in map {
                match value.as_array() {
                    Some(items) => {
                        let mut task_names = Vec::with_capacity(items.len());
                        let mut ok = true;
                        for item in items {
                            match item.as_str() {
                                Some(task_name) => task_names.push(task_name.to_string()),
                                None => {
                                    ok = false;
                                    errors.push(format!(
                                        "pipeline `{name}` must be an array of task name strings"
                                    ));
                                    break;
                                }
                            }
                        }
                        if ok {
                            pipelines.insert(name, task_names);
                        }
                    }
                    None => errors.push(format!(
                        "pipeline `{name}` must be an array of task name strings"
                    )),
                }
            }
            Some(pipelines)
        }
    };

    // Cross-reference: every task name in any pipeline must exist in `tasks`.
    if let (Some(tasks), Some(pipelines)) = (&tasks, &pipelines) {
        for (pipeline_name, task_names) in pipelines {
            for task_name in task_names {
                if !tasks.contains_key(task_name) {
                    errors.push(format!(
                        "pipeline `{pipeline_name}` references unknown task `{task_name}`"
                    ));
                }
            }
        }
    }

    match (tasks, pipelines) {
        (Some(tasks), Some(pipelines)) if errors.is_empty() => Ok(ProjectBuildConfig { tasks, pipelines }),
        _ => Err(errors),
    }
}
