// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Locating the build-config file at a repository root.

use crate::parse::ConfigError;
use std::path::{Path, PathBuf};

/// Source format of a discovered config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

/// Candidate filenames, in the priority order spec.md §4.5 lists them.
const CANDIDATES: &[(&str, Format)] = &[
    ("boxci.json", Format::Json),
    ("boxci.yml", Format::Yaml),
    ("boxci.yaml", Format::Yaml),
];

/// Find the build-config file at `repo_root`.
///
/// Exactly one of `boxci.json`, `boxci.yml`, `boxci.yaml` must exist;
/// zero or more than one present is a configuration error.
pub fn discover_config_file(repo_root: &Path) -> Result<(PathBuf, Format), ConfigError> {
    let mut found: Vec<(PathBuf, Format)> = CANDIDATES
        .iter()
        .map(|(name, format)| (repo_root.join(name), *format))
        .filter(|(path, _)| path.is_file())
        .collect();

    match found.pop() {
        None => Err(ConfigError::NotFound {
            dir: repo_root.to_path_buf(),
        }),
        Some(only) if found.is_empty() => Ok(only),
        Some(last) => {
            found.push(last);
            Err(ConfigError::Ambiguous {
                dir: repo_root.to_path_buf(),
                found: found.into_iter().map(|(path, _)| path).collect(),
            })
        }
    }
}
