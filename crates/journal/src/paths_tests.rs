// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial]
fn resolve_honors_boxci_home_override() {
    let dir = tempdir().unwrap();
    std::env::set_var("BOXCI_HOME", dir.path());
    let paths = JournalPaths::resolve().unwrap();
    assert_eq!(paths.root(), dir.path());
    std::env::remove_var("BOXCI_HOME");
}

#[test]
#[serial]
fn layout_methods_nest_under_root() {
    let dir = tempdir().unwrap();
    std::env::set_var("BOXCI_HOME", dir.path());
    let paths = JournalPaths::resolve().unwrap();

    assert_eq!(paths.build_dir("Babcdefghijk"), dir.path().join("b/Babcdefghijk"));
    assert_eq!(
        paths.build_logs_dir("Babcdefghijk"),
        dir.path().join("b/Babcdefghijk/logs")
    );
    assert_eq!(
        paths.build_meta_dir("Babcdefghijk"),
        dir.path().join("b/Babcdefghijk/meta")
    );
    assert_eq!(paths.boxci_meta_dir(), dir.path().join("meta/boxci"));
    assert_eq!(
        paths.agent_dir("agent-a"),
        dir.path().join("meta/agent/agent-a")
    );
    assert_eq!(
        paths.agent_repo_dir("agent-a"),
        dir.path().join("meta/agent/agent-a/repo")
    );

    std::env::remove_var("BOXCI_HOME");
}

#[test]
#[serial]
fn all_build_dirs_empty_when_root_absent() {
    let dir = tempdir().unwrap();
    std::env::set_var("BOXCI_HOME", dir.path().join("does-not-exist"));
    let paths = JournalPaths::resolve().unwrap();
    assert!(paths.all_build_dirs().unwrap().is_empty());
    assert!(paths.all_agent_dirs().unwrap().is_empty());
    std::env::remove_var("BOXCI_HOME");
}

#[test]
#[serial]
fn all_build_dirs_lists_created_builds() {
    let dir = tempdir().unwrap();
    std::env::set_var("BOXCI_HOME", dir.path());
    let paths = JournalPaths::resolve().unwrap();
    std::fs::create_dir_all(paths.build_dir("Babcdefghijk")).unwrap();
    std::fs::create_dir_all(paths.build_dir("Bzzzzzzzzzzz")).unwrap();

    let mut dirs = paths.all_build_dirs().unwrap();
    dirs.sort();
    assert_eq!(dirs.len(), 2);
    std::env::remove_var("BOXCI_HOME");
}
