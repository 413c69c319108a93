// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconstruction of journal records from merged event files.
//!
//! A journal directory holds an ordered sequence of `{timestamp}.json` event
//! files. The effective record for that directory is the shallow merge of
//! those files' JSON objects, applied in filename order (last writer wins
//! per key). This module is pure: it knows nothing about the filesystem,
//! only about folding already-read `(filename, value)` pairs.

use serde_json::{Map, Value};

/// Shallow-merge a sequence of event file bodies into one effective record.
///
/// `events` is sorted by filename (lexicographic millisecond-timestamp
/// order, possibly with a disambiguating suffix) before folding, so callers
/// may pass them in any order. Entries whose body is not a JSON object are
/// skipped — this is how a corrupt event file is tolerated rather than
/// treated as fatal.
pub fn merge_events<I>(events: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut sorted: Vec<(String, Value)> = events.into_iter().collect();
    sorted.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut merged = Map::new();
    for (_, value) in sorted {
        if let Value::Object(fields) = value {
            merged.extend(fields);
        }
    }
    merged
}

fn get_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)?.as_str().map(str::to_string)
}

fn get_u64(map: &Map<String, Value>, key: &str) -> Option<u64> {
    map.get(key)?.as_u64()
}

fn get_bool(map: &Map<String, Value>, key: &str) -> Option<bool> {
    map.get(key)?.as_bool()
}

/// Process-wide record under `meta/boxci/`. Empty at agent bootstrap;
/// accumulates whatever process-level events are written over time.
#[derive(Debug, Clone, Default)]
pub struct BoxCiMeta {
    pub fields: Map<String, Value>,
}

impl BoxCiMeta {
    pub fn from_merged(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Record under `meta/agent/<agentName>/`, seeded by `createAgentMeta` with
/// `{p, t}` (project id, created-at timestamp) and later extended by
/// `writeAgentStopped`.
#[derive(Debug, Clone)]
pub struct AgentMeta {
    pub project_id: Option<String>,
    pub created_at: Option<u64>,
    pub stopped_at: Option<u64>,
    pub stop_reason: Option<String>,
    pub fields: Map<String, Value>,
}

impl AgentMeta {
    pub fn from_merged(fields: Map<String, Value>) -> Self {
        Self {
            project_id: get_str(&fields, "p"),
            created_at: get_u64(&fields, "t"),
            stopped_at: get_u64(&fields, "stoppedAt"),
            stop_reason: get_str(&fields, "reason"),
            fields,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped_at.is_some()
    }
}

/// Record under `b/<buildId>/meta/`, seeded by `createBuildDir` with
/// `{id, a, p, t}` (build id, agent name, project id, created-at timestamp).
#[derive(Debug, Clone)]
pub struct BuildMeta {
    pub id: Option<String>,
    pub agent_name: Option<String>,
    pub project_id: Option<String>,
    pub created_at: Option<u64>,
    pub cancelled: bool,
    pub timed_out: bool,
    pub fields: Map<String, Value>,
}

impl BuildMeta {
    pub fn from_merged(fields: Map<String, Value>) -> Self {
        Self {
            id: get_str(&fields, "id"),
            agent_name: get_str(&fields, "a"),
            project_id: get_str(&fields, "p"),
            created_at: get_u64(&fields, "t"),
            cancelled: get_bool(&fields, "cancelled").unwrap_or(false),
            timed_out: get_bool(&fields, "timedOut").unwrap_or(false),
            fields,
        }
    }
}

#[cfg(test)]
#[path = "journal_record_tests.rs"]
mod tests;
