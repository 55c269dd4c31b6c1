//! Event discriminant covering the 13 event kinds.
//!
//! The string form is the snake_case tag used both in the line codec and as
//! the `type` field of the JSON encoding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The 13 event kinds in the log schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    TaskCreated,
    TaskRenamed,
    TaskAttachedToContext,
    TaskDetachedFromContext,
    TaskChecked,
    TaskUnchecked,
    TaskDueDateSet,
    TaskDueDateUnset,
    TaskDeleted,
    ContextCreated,
    ContextRenamed,
    ContextDeleted,
    TaskReorderedInContext,
}

/// Error returned when parsing an unknown event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type '{}': expected one of ", self.raw)?;
        for (i, et) in EventType::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(et.as_str())?;
        }
        Ok(())
    }
}

impl std::error::Error for UnknownEventType {}

impl EventType {
    /// All event types in schema order.
    pub const ALL: [Self; 13] = [
        Self::TaskCreated,
        Self::TaskRenamed,
        Self::TaskAttachedToContext,
        Self::TaskDetachedFromContext,
        Self::TaskChecked,
        Self::TaskUnchecked,
        Self::TaskDueDateSet,
        Self::TaskDueDateUnset,
        Self::TaskDeleted,
        Self::ContextCreated,
        Self::ContextRenamed,
        Self::ContextDeleted,
        Self::TaskReorderedInContext,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskCreated => "task_created",
            Self::TaskRenamed => "task_renamed",
            Self::TaskAttachedToContext => "task_attached_to_context",
            Self::TaskDetachedFromContext => "task_detached_from_context",
            Self::TaskChecked => "task_checked",
            Self::TaskUnchecked => "task_unchecked",
            Self::TaskDueDateSet => "task_due_date_set",
            Self::TaskDueDateUnset => "task_due_date_unset",
            Self::TaskDeleted => "task_deleted",
            Self::ContextCreated => "context_created",
            Self::ContextRenamed => "context_renamed",
            Self::ContextDeleted => "context_deleted",
            Self::TaskReorderedInContext => "task_reordered_in_context",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|et| et.as_str() == s)
            .ok_or_else(|| UnknownEventType { raw: s.to_string() })
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fromstr_all_types() {
        for et in EventType::ALL {
            let parsed: EventType = et.as_str().parse().expect("should parse");
            assert_eq!(parsed, et);
        }
    }

    #[test]
    fn fromstr_rejects_unknown() {
        let err = "task_exploded".parse::<EventType>().unwrap_err();
        assert_eq!(err.raw, "task_exploded");
        assert!(err.to_string().contains("expected one of"));
    }

    #[test]
    fn fromstr_is_case_sensitive() {
        assert!("Task_Created".parse::<EventType>().is_err());
        assert!("".parse::<EventType>().is_err());
    }

    #[test]
    fn error_display_includes_valid_options() {
        let msg = UnknownEventType { raw: "nope".into() }.to_string();
        for et in EventType::ALL {
            assert!(msg.contains(et.as_str()), "missing {}", et.as_str());
        }
    }

    #[test]
    fn serde_uses_tag_string() {
        let json = serde_json::to_string(&EventType::TaskReorderedInContext).expect("serialize");
        assert_eq!(json, "\"task_reordered_in_context\"");
        assert!(serde_json::from_str::<EventType>("\"task_frobbed\"").is_err());
    }
}
