//! Opaque identifiers for tasks and contexts.
//!
//! Identifiers are generated as `<kind>:<16 hex digits>` from a random
//! `u64`, but any string is accepted when read back from a log: logs written
//! by older versions used shorter random suffixes.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// What an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    Task,
    Context,
}

impl IdKind {
    /// Prefix used for generated identifiers of this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Context => "context",
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Identifier of a task or context. Stable for the entity's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Wrap an existing identifier string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Generate a fresh random identifier of the given kind.
    ///
    /// Callers that must avoid ids already present in a log should go
    /// through [`Engine::new_id`](crate::engine::Engine::new_id).
    #[must_use]
    pub fn generate(kind: IdKind) -> Self {
        Self(format!("{}:{:016x}", kind.prefix(), rand::random::<u64>()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The kind encoded in the prefix, if the id carries a known one.
    #[must_use]
    pub fn kind(&self) -> Option<IdKind> {
        match self.0.split_once(':') {
            Some(("task", _)) => Some(IdKind::Task),
            Some(("context", _)) => Some(IdKind::Context),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Id {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Id {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Id {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_kind_prefix() {
        let task = Id::generate(IdKind::Task);
        let context = Id::generate(IdKind::Context);
        assert!(task.as_str().starts_with("task:"));
        assert!(context.as_str().starts_with("context:"));
        assert_eq!(task.kind(), Some(IdKind::Task));
        assert_eq!(context.kind(), Some(IdKind::Context));
    }

    #[test]
    fn generated_suffix_is_sixteen_hex_digits() {
        let id = Id::generate(IdKind::Task);
        let (_, suffix) = id.as_str().split_once(':').expect("prefix separator");
        assert_eq!(suffix.len(), 16);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_differ() {
        let a = Id::generate(IdKind::Task);
        let b = Id::generate(IdKind::Task);
        assert_ne!(a, b);
    }

    #[test]
    fn legacy_ids_are_accepted() {
        let id = Id::new("task:3fa9c1");
        assert_eq!(id.kind(), Some(IdKind::Task));
        assert_eq!(Id::new("t1").kind(), None);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = Id::new("context:abc");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"context:abc\"");
        let back: Id = serde_json::from_str("\"context:abc\"").expect("deserialize");
        assert_eq!(back, id);
    }
}
