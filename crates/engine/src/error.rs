// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds for build orchestration. Preparation, task execution, and
//! sync failures are all reported to the server and journal rather than
//! raised (spec.md §7); `EngineError` exists only for the handful of
//! failures that have no such home, namely setting up the per-build log
//! streams before a build can even start.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot open build logger for {build_id}: {source}")]
    OpenLogger {
        build_id: String,
        source: std::io::Error,
    },
}
