// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline-ref wildcard matching, per spec.md §4.5.

use boxci_core::ProjectBuildConfig;

/// Does pipeline name `pattern` match ref `reference`?
///
/// Exactly one `*` is supported; additional `*`s in `pattern` are treated
/// as literal characters after the first.
pub fn matches(pattern: &str, reference: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if pattern == reference {
        return true;
    }
    let Some(star) = pattern.find('*') else {
        return false;
    };

    let (prefix, suffix) = (&pattern[..star], &pattern[star + 1..]);
    if star == 0 {
        reference.ends_with(suffix)
    } else if star == pattern.len() - 1 {
        reference.starts_with(prefix)
    } else {
        reference.starts_with(prefix) && reference.ends_with(suffix)
    }
}

/// Select the first pipeline (in declaration order) whose name matches
/// `reference`.
pub fn select_pipeline<'a>(config: &'a ProjectBuildConfig, reference: &str) -> Option<&'a str> {
    config
        .pipelines
        .keys()
        .find(|name| matches(name, reference))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxci_core::ProjectBuildConfig;
    use indexmap::IndexMap;

    #[test]
    fn catch_all_matches_everything() {
        assert!(matches("*", "anything"));
        assert!(matches("*", ""));
    }

    #[test]
    fn exact_match() {
        assert!(matches("master", "master"));
        assert!(!matches("master", "main"));
    }

    #[test]
    fn leading_wildcard_matches_suffix() {
        assert!(matches("*bar", "foobar"));
        assert!(!matches("*bar", "foobaz"));
    }

    #[test]
    fn trailing_wildcard_matches_prefix() {
        assert!(matches("foo*", "foobar"));
        assert!(!matches("foo*", "barfoo"));
    }

    #[test]
    fn middle_wildcard_matches_prefix_and_suffix() {
        assert!(matches("f*r", "foobar"));
        assert!(!matches("f*r", "foobaz"));
    }

    #[test]
    fn literal_with_no_wildcard_requires_exact_match() {
        assert!(!matches("foo", "foobar"));
    }

    #[test]
    fn extra_stars_after_first_are_literal() {
        // Only the first `*` is special; the second is a literal char.
        assert!(matches("a*b*c", "aXb*c"));
        assert!(!matches("a*b*c", "aXbYc"));
    }

    #[test]
    fn select_pipeline_honors_declaration_order() {
        let mut pipelines = IndexMap::new();
        pipelines.insert("release-*".to_string(), vec!["a".to_string()]);
        pipelines.insert("*".to_string(), vec!["a".to_string()]);
        let config = ProjectBuildConfig {
            tasks: IndexMap::from([("a".to_string(), "echo hi".to_string())]),
            pipelines,
        };

        assert_eq!(select_pipeline(&config, "release-2"), Some("release-*"));
        assert_eq!(select_pipeline(&config, "main"), Some("*"));
    }

    #[test]
    fn select_pipeline_returns_none_when_nothing_matches() {
        let mut pipelines = IndexMap::new();
        pipelines.insert("release".to_string(), vec!["a".to_string()]);
        let config = ProjectBuildConfig {
            tasks: IndexMap::from([("a".to_string(), "echo hi".to_string())]),
            pipelines,
        };

        assert_eq!(select_pipeline(&config, "main"), None);
    }
}
