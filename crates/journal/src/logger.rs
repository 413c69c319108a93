// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-build log streams: raw subprocess output and leveled agent events.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Event verbosity level. Ordered `Error < Info < Debug < Trace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Info,
    Debug,
    Trace,
}

/// Two append streams for one build: `logs-<buildId>.txt` (raw, unfiltered
/// subprocess output) and `events-<buildId>.txt` (agent activity, filtered
/// by `threshold`). Close is idempotent.
pub struct BuildLogger {
    logs_file: Mutex<Option<File>>,
    events_file: Mutex<Option<File>>,
    threshold: LogLevel,
    closed: AtomicBool,
}

impl BuildLogger {
    pub fn open(logs_dir: &Path, build_id: &str, threshold: LogLevel) -> std::io::Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        let logs_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs_dir.join(format!("logs-{build_id}.txt")))?;
        let events_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs_dir.join(format!("events-{build_id}.txt")))?;
        Ok(Self {
            logs_file: Mutex::new(Some(logs_file)),
            events_file: Mutex::new(Some(events_file)),
            threshold,
            closed: AtomicBool::new(false),
        })
    }

    /// Append raw subprocess output, unfiltered. Swallows write failures.
    pub fn write_raw(&self, chunk: &str) {
        let mut guard = self.logs_file.lock();
        if let Some(file) = guard.as_mut() {
            if let Err(e) = file.write_all(chunk.as_bytes()) {
                warn!(error = %e, "build logger: failed to write raw output");
            }
        }
    }

    /// Append a structured event line, iff `level` is at or below the
    /// configured threshold. Swallows write failures.
    pub fn write_event(&self, level: LogLevel, line: &str) {
        if level > self.threshold {
            return;
        }
        let mut guard = self.events_file.lock();
        if let Some(file) = guard.as_mut() {
            if let Err(e) = writeln!(file, "{line}") {
                warn!(error = %e, "build logger: failed to write event");
            }
        }
    }

    /// Close both streams. Safe to call more than once; the second and
    /// later calls are no-ops.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.logs_file.lock().take();
        self.events_file.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for BuildLogger {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
