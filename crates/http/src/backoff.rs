// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry/backoff policy for the control-service client, per spec.md §4.2.
//!
//! Kept as a hand-rolled policy rather than a generic retry crate: the
//! "502 is special and doesn't count toward max-retries" rule and the
//! single-fire connecting/done-connecting callback don't fit a generic
//! retry abstraction cleanly.

use rand::Rng;
use std::time::Duration;

/// Default period between retries for ordinary (non-502) failures.
pub const DEFAULT_RETRY_PERIOD: Duration = Duration::from_secs(5);

/// Default number of ordinary retries before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Fixed period between attempts while the service is reporting 502.
pub const SERVICE_DOWN_PERIOD: Duration = Duration::from_secs(30);

/// Per-invocation override of the retry cadence.
#[derive(Debug, Clone, Copy)]
pub struct RetryOptions {
    pub retry_period: Duration,
    pub max_retries: u32,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            retry_period: DEFAULT_RETRY_PERIOD,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Apply ±20% jitter to `period`.
pub fn jittered(period: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let factor = rng.gen_range(0.8..=1.2);
    Duration::from_secs_f64(period.as_secs_f64() * factor)
}

/// Observes entry/exit of a retry cycle so the caller can surface a visual
/// "connecting" / "reconnected" indication. Single-fire: `connecting` is
/// invoked at most once per retry cycle, and `done_connecting` at most once
/// to close it out.
pub trait ConnectionObserver: Send + Sync {
    fn connecting(&self);
    fn done_connecting(&self);
}

/// Observer that does nothing; the default when the caller has no UI.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ConnectionObserver for NoopObserver {
    fn connecting(&self) {}
    fn done_connecting(&self) {}
}
