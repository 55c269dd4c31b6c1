//! Event schema for the task log.
//!
//! [`Event`] is a closed sum type with one variant per [`EventType`]. Each
//! variant carries only the fields needed to apply it, never a snapshot of
//! the affected entity.
//!
//! # JSON shape
//!
//! Events serialize internally tagged, with camelCase field names:
//!
//! ```text
//! {"type":"task_attached_to_context","taskId":"task:…","contextId":"context:…"}
//! ```
//!
//! Early logs named the entity field `id`; it is accepted as an alias for
//! `taskId`/`contextId` when decoding.

pub mod canonical;
pub mod codec;
pub mod types;

pub use types::{EventType, UnknownEventType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::id::Id;

/// A single immutable change to task/context state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Event {
    TaskCreated {
        #[serde(alias = "id")]
        task_id: Id,
        /// The earliest logs created tasks unnamed and renamed them after.
        #[serde(default)]
        name: String,
    },
    TaskRenamed {
        #[serde(alias = "id")]
        task_id: Id,
        name: String,
    },
    TaskAttachedToContext {
        task_id: Id,
        context_id: Id,
    },
    TaskDetachedFromContext {
        task_id: Id,
        context_id: Id,
    },
    TaskChecked {
        #[serde(alias = "id")]
        task_id: Id,
    },
    TaskUnchecked {
        #[serde(alias = "id")]
        task_id: Id,
    },
    TaskDueDateSet {
        task_id: Id,
        due_date: DateTime<Utc>,
    },
    TaskDueDateUnset {
        task_id: Id,
    },
    TaskDeleted {
        #[serde(alias = "id")]
        task_id: Id,
    },
    ContextCreated {
        #[serde(alias = "id")]
        context_id: Id,
        name: String,
    },
    ContextRenamed {
        #[serde(alias = "id")]
        context_id: Id,
        name: String,
    },
    ContextDeleted {
        #[serde(alias = "id")]
        context_id: Id,
    },
    TaskReorderedInContext {
        context_id: Id,
        old_position: usize,
        new_position: usize,
    },
}

impl Event {
    /// The discriminant of this event.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::TaskCreated { .. } => EventType::TaskCreated,
            Self::TaskRenamed { .. } => EventType::TaskRenamed,
            Self::TaskAttachedToContext { .. } => EventType::TaskAttachedToContext,
            Self::TaskDetachedFromContext { .. } => EventType::TaskDetachedFromContext,
            Self::TaskChecked { .. } => EventType::TaskChecked,
            Self::TaskUnchecked { .. } => EventType::TaskUnchecked,
            Self::TaskDueDateSet { .. } => EventType::TaskDueDateSet,
            Self::TaskDueDateUnset { .. } => EventType::TaskDueDateUnset,
            Self::TaskDeleted { .. } => EventType::TaskDeleted,
            Self::ContextCreated { .. } => EventType::ContextCreated,
            Self::ContextRenamed { .. } => EventType::ContextRenamed,
            Self::ContextDeleted { .. } => EventType::ContextDeleted,
            Self::TaskReorderedInContext { .. } => EventType::TaskReorderedInContext,
        }
    }

    /// The task this event touches, if any.
    #[must_use]
    pub const fn task_id(&self) -> Option<&Id> {
        match self {
            Self::TaskCreated { task_id, .. }
            | Self::TaskRenamed { task_id, .. }
            | Self::TaskAttachedToContext { task_id, .. }
            | Self::TaskDetachedFromContext { task_id, .. }
            | Self::TaskChecked { task_id }
            | Self::TaskUnchecked { task_id }
            | Self::TaskDueDateSet { task_id, .. }
            | Self::TaskDueDateUnset { task_id }
            | Self::TaskDeleted { task_id } => Some(task_id),
            Self::ContextCreated { .. }
            | Self::ContextRenamed { .. }
            | Self::ContextDeleted { .. }
            | Self::TaskReorderedInContext { .. } => None,
        }
    }

    /// The context this event touches, if any.
    #[must_use]
    pub const fn context_id(&self) -> Option<&Id> {
        match self {
            Self::TaskAttachedToContext { context_id, .. }
            | Self::TaskDetachedFromContext { context_id, .. }
            | Self::ContextCreated { context_id, .. }
            | Self::ContextRenamed { context_id, .. }
            | Self::ContextDeleted { context_id }
            | Self::TaskReorderedInContext { context_id, .. } => Some(context_id),
            Self::TaskCreated { .. }
            | Self::TaskRenamed { .. }
            | Self::TaskChecked { .. }
            | Self::TaskUnchecked { .. }
            | Self::TaskDueDateSet { .. }
            | Self::TaskDueDateUnset { .. }
            | Self::TaskDeleted { .. } => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_type())?;
        match self {
            Self::TaskCreated { task_id, name } | Self::TaskRenamed { task_id, name } => {
                write!(f, " {task_id} {name:?}")
            }
            Self::TaskAttachedToContext {
                task_id,
                context_id,
            }
            | Self::TaskDetachedFromContext {
                task_id,
                context_id,
            } => write!(f, " {task_id} @ {context_id}"),
            Self::TaskChecked { task_id }
            | Self::TaskUnchecked { task_id }
            | Self::TaskDueDateUnset { task_id }
            | Self::TaskDeleted { task_id } => write!(f, " {task_id}"),
            Self::TaskDueDateSet { task_id, due_date } => {
                write!(f, " {task_id} {}", due_date.to_rfc3339())
            }
            Self::ContextCreated { context_id, name }
            | Self::ContextRenamed { context_id, name } => write!(f, " {context_id} {name:?}"),
            Self::ContextDeleted { context_id } => write!(f, " {context_id}"),
            Self::TaskReorderedInContext {
                context_id,
                old_position,
                new_position,
            } => write!(f, " {context_id} {old_position} -> {new_position}"),
        }
    }
}
