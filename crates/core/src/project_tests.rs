// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample(repo_type: RepoType, url: &str) -> Project {
    Project {
        project_id: ProjectId::new("Pabcdefg"),
        git_repo_ssh_url: url.to_string(),
        repo_type,
    }
}

#[test]
fn rewrite_applies_to_github_host_only() {
    let mut project = sample(RepoType::GitHub, "git@github.com:acme/widgets.git");
    project.apply_ssh_host_rewrite(Some("git.internal.example"));
    assert_eq!(project.git_repo_ssh_url, "git@git.internal.example:acme/widgets.git");
}

#[test]
fn rewrite_is_noop_for_non_github_repo_types() {
    let mut project = sample(RepoType::GitLab, "git@github.com:acme/widgets.git");
    project.apply_ssh_host_rewrite(Some("git.internal.example"));
    assert_eq!(project.git_repo_ssh_url, "git@github.com:acme/widgets.git");
}

#[test]
fn rewrite_is_noop_when_no_ssh_host_given() {
    let mut project = sample(RepoType::GitHub, "git@github.com:acme/widgets.git");
    project.apply_ssh_host_rewrite(None);
    assert_eq!(project.git_repo_ssh_url, "git@github.com:acme/widgets.git");
}

#[test]
fn rewrite_only_replaces_first_occurrence() {
    let mut project = sample(
        RepoType::GitHub,
        "git@github.com:acme/github.com-mirror.git",
    );
    project.apply_ssh_host_rewrite(Some("git.internal.example"));
    assert_eq!(
        project.git_repo_ssh_url,
        "git@git.internal.example:acme/github.com-mirror.git"
    );
}

#[test]
fn repo_type_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&RepoType::GitHub).unwrap(), "\"git_hub\"");
    assert_eq!(serde_json::to_string(&RepoType::Bitbucket).unwrap(), "\"bitbucket\"");
}
