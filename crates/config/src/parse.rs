// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level config loading: discover the file, parse it, validate it.

use crate::discover::{discover_config_file, Format};
use crate::validate::{validate, RawConfig};
use boxci_core::ProjectBuildConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no build config (boxci.json/boxci.yml/boxci.yaml) found in {dir}", dir = dir.display())]
    NotFound { dir: PathBuf },

    #[error(
        "ambiguous build config: found {n} of boxci.json/boxci.yml/boxci.yaml in {dir} ({files})",
        n = found.len(),
        dir = dir.display(),
        files = found.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "),
    )]
    Ambiguous { dir: PathBuf, found: Vec<PathBuf> },

    #[error("cannot read {path}: {source}", path = path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("cannot parse {path} as {format}: {message}", path = path.display())]
    Parse { path: PathBuf, format: &'static str, message: String },

    #[error("invalid build config at {path}: {}", path = path.display(), .errors.join("; "))]
    Invalid { path: PathBuf, errors: Vec<String> },
}

/// Discover, parse, and validate the build config at `repo_root`.
pub fn load_config(repo_root: &Path) -> Result<ProjectBuildConfig, ConfigError> {
    let (path, format) = discover_config_file(repo_root)?;
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;

    let raw: RawConfig = match format {
        Format::Json => serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            format: "JSON",
            message: e.to_string(),
        })?,
        Format::Yaml => serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            format: "YAML",
            message: e.to_string(),
        })?,
    };

    validate(raw).map_err(|errors| ConfigError::Invalid { path, errors })
}
