// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn merge_events_applies_last_writer_wins_in_filename_order() {
    let events = vec![
        ("0000000000002.json".to_string(), json!({"p": "Pabcdefg", "t": 2})),
        ("0000000000001.json".to_string(), json!({"p": "Pwrong00", "t": 1})),
    ];
    let merged = merge_events(events);
    assert_eq!(merged.get("p").unwrap(), "Pabcdefg");
    assert_eq!(merged.get("t").unwrap(), 2);
}

#[test]
fn merge_events_shallow_merges_distinct_keys() {
    let events = vec![
        ("0000000000001.json".to_string(), json!({"p": "Pabcdefg", "t": 1})),
        ("0000000000002.json".to_string(), json!({"stoppedAt": 99, "reason": "stopped-from-app"})),
    ];
    let merged = merge_events(events);
    assert_eq!(merged.get("p").unwrap(), "Pabcdefg");
    assert_eq!(merged.get("stoppedAt").unwrap(), 99);
}

#[test]
fn merge_events_skips_non_object_bodies() {
    let events = vec![
        ("0000000000001.json".to_string(), json!({"p": "Pabcdefg"})),
        ("0000000000002.json".to_string(), json!("not an object")),
    ];
    let merged = merge_events(events);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.get("p").unwrap(), "Pabcdefg");
}

#[test]
fn merge_events_empty_input_yields_empty_map() {
    let merged = merge_events(Vec::<(String, serde_json::Value)>::new());
    assert!(merged.is_empty());
}

#[test]
fn agent_meta_reads_known_fields() {
    let merged = merge_events(vec![(
        "0000000000001.json".to_string(),
        json!({"p": "Pabcdefg", "t": 1000}),
    )]);
    let meta = AgentMeta::from_merged(merged);
    assert_eq!(meta.project_id.as_deref(), Some("Pabcdefg"));
    assert_eq!(meta.created_at, Some(1000));
    assert!(!meta.is_stopped());
}

#[test]
fn agent_meta_reflects_stop_event() {
    let merged = merge_events(vec![
        ("0000000000001.json".to_string(), json!({"p": "Pabcdefg", "t": 1000})),
        (
            "0000000000002.json".to_string(),
            json!({"stoppedAt": 2000, "reason": "stopped-from-app"}),
        ),
    ]);
    let meta = AgentMeta::from_merged(merged);
    assert!(meta.is_stopped());
    assert_eq!(meta.stop_reason.as_deref(), Some("stopped-from-app"));
}

#[test]
fn build_meta_reads_known_fields_and_flags() {
    let merged = merge_events(vec![
        (
            "0000000000001.json".to_string(),
            json!({"id": "Babcdefghijk", "a": "agent-x", "p": "Pabcdefg", "t": 10}),
        ),
        ("0000000000002.json".to_string(), json!({"cancelled": true})),
    ]);
    let meta = BuildMeta::from_merged(merged);
    assert_eq!(meta.id.as_deref(), Some("Babcdefghijk"));
    assert_eq!(meta.agent_name.as_deref(), Some("agent-x"));
    assert!(meta.cancelled);
    assert!(!meta.timed_out);
}

#[test]
fn box_ci_meta_preserves_arbitrary_fields() {
    let merged = merge_events(vec![(
        "0000000000001.json".to_string(),
        json!({"whatever": "value"}),
    )]);
    let meta = BoxCiMeta::from_merged(merged);
    assert_eq!(meta.fields.get("whatever").unwrap(), "value");
}
