// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration: a TOML file merged with environment variable
//! overrides. See spec.md §6 "Configuration".

use boxci_core::agent::MAX_MACHINE_NAME_LEN;
use boxci_core::ProjectId;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Default control-service base URL. Overridden by `service` in the config
/// file or the `BOXCI___TS` environment variable.
pub const DEFAULT_SERVICE: &str = "https://api.boxci.dev";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read agent config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("cannot parse agent config file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
    #[error("projectId is required")]
    MissingProjectId,
    #[error("projectId must be 8 characters starting with 'P'")]
    InvalidProjectId,
    #[error("key is required")]
    MissingKey,
    #[error("machineName must be at most {MAX_MACHINE_NAME_LEN} characters")]
    MachineNameTooLong,
}

/// Raw, unvalidated config-file shape. Every field optional: the file may be
/// partial or absent entirely, with the rest supplied by environment
/// variables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAgentConfig {
    #[serde(rename = "projectId", default)]
    project_id: Option<String>,
    #[serde(default)]
    key: Option<String>,
    #[serde(rename = "machineName", default)]
    machine_name: Option<String>,
    #[serde(rename = "sshHost", default)]
    ssh_host: Option<String>,
    #[serde(default)]
    silent: Option<bool>,
    #[serde(default)]
    service: Option<String>,
}

/// Resolved, validated agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub project_id: ProjectId,
    pub key: String,
    pub machine_name: Option<String>,
    pub ssh_host: Option<String>,
    pub silent: bool,
    pub service: String,
}

impl AgentConfig {
    /// Load from a TOML file at `path` (missing file treated as empty),
    /// merged with `BOXCI_PROJECT`/`BOXCI_KEY`/`BOXCI_MACHINE`/
    /// `BOXCI_SILENT`/`BOXCI___TS` environment overrides, then validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = Self::read_raw(path)?;
        Self::resolve(raw)
    }

    fn read_raw(path: &Path) -> Result<RawAgentConfig, ConfigError> {
        if !path.exists() {
            return Ok(RawAgentConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
    }

    fn resolve(raw: RawAgentConfig) -> Result<Self, ConfigError> {
        let project_id = env_override("BOXCI_PROJECT")
            .or(raw.project_id)
            .ok_or(ConfigError::MissingProjectId)?;
        let project_id = ProjectId::new(project_id);
        if !project_id.is_valid() {
            return Err(ConfigError::InvalidProjectId);
        }

        let key = env_override("BOXCI_KEY").or(raw.key).ok_or(ConfigError::MissingKey)?;
        if key.is_empty() {
            return Err(ConfigError::MissingKey);
        }

        let machine_name = env_override("BOXCI_MACHINE").or(raw.machine_name);
        if let Some(name) = &machine_name {
            if name.len() > MAX_MACHINE_NAME_LEN {
                return Err(ConfigError::MachineNameTooLong);
            }
        }

        let silent = match env_override("BOXCI_SILENT") {
            Some(v) => is_truthy(&v),
            None => raw.silent.unwrap_or(false),
        };

        let service = env_override("BOXCI___TS").or(raw.service).unwrap_or_else(|| DEFAULT_SERVICE.to_string());

        Ok(Self {
            project_id,
            key,
            machine_name,
            ssh_host: raw.ssh_host,
            silent,
            service,
        })
    }

    /// `true` once `service` diverges from [`DEFAULT_SERVICE`] — the
    /// "using test service" warning's trigger (spec.md §6).
    pub fn using_test_service(&self) -> bool {
        self.service != DEFAULT_SERVICE
    }
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn is_truthy(v: &str) -> bool {
    matches!(v, "1" | "true" | "TRUE" | "True")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
