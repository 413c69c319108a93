// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! boxci-engine: drives one build from preparation through task execution
//! and log sync. See spec.md §4.6-§4.10.

mod build_runner;
mod error;
mod prepare;
mod session;
mod sync;

pub use build_runner::{
    BuildRunOutcome, BuildRunner, BuildRunnerContext, SharedBuildState, TaskSlot,
};
pub use error::EngineError;
pub use prepare::{BuildPreparer, PrepareOutcome, PrepareRequest, PrepareRetryOptions};
pub use session::{run_build_session, BuildSessionOutcome, BuildSessionRequest, LiveSync};
pub use sync::{SyncEngine, TickOutcome, DEFAULT_TICK_INTERVAL};
