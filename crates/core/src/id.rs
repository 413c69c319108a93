// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation and newtype identifiers.

/// Trait for truncating identifiers to a short prefix.
pub trait ShortId {
    /// Returns a string slice truncated to at most `n` characters.
    fn short(&self, n: usize) -> &str;
}

impl ShortId for str {
    fn short(&self, n: usize) -> &str {
        if self.len() <= n {
            self
        } else {
            &self[..n]
        }
    }
}

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `short()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns a string slice truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                if self.0.len() <= n {
                    &self.0
                } else {
                    &self.0[..n]
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// Server-assigned project identifier: 8 chars, starts with `P`.
    pub struct ProjectId;
}

impl ProjectId {
    /// Returns `true` iff this is an 8-char id starting with `P`.
    pub fn is_valid(&self) -> bool {
        self.0.len() == 8 && self.0.starts_with('P')
    }
}

crate::define_id! {
    /// Server-assigned build identifier: 12 chars, starts with `B`.
    pub struct BuildId;
}

impl BuildId {
    /// Returns `true` iff this is a 12-char id starting with `B`.
    pub fn is_valid(&self) -> bool {
        self.0.len() == 12 && self.0.starts_with('B')
    }
}

crate::define_id! {
    /// Locally generated agent name, `agent-xxxx-xxxx-xxxx-xxxx`.
    #[derive(Default)]
    pub struct AgentName;
}

/// Generates unique identifiers.
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// UUID-derived agent-name generator: `agent-` followed by four dash-joined
/// four-character lowercase alphanumeric tokens, drawn from a v4 UUID's hex
/// groups (already lowercase hex, which satisfies "lowercase alphanumerics
/// per group").
#[derive(Clone, Default)]
pub struct RandomIdGen;

impl RandomIdGen {
    /// Generate a fresh agent name.
    pub fn agent_name(&self) -> AgentName {
        AgentName::new(self.next())
    }
}

impl IdGen for RandomIdGen {
    fn next(&self) -> String {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        let tokens: Vec<&str> = raw
            .as_bytes()
            .chunks(4)
            .take(4)
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
            .collect();
        format!("agent-{}", tokens.join("-"))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
