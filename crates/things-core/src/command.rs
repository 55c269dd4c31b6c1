//! Precondition failures of the command layer.
//!
//! Every command checks its preconditions against current state before
//! emitting anything. A failed check returns a [`CommandError`] and leaves
//! the log, the state and the subscribers untouched.

use crate::error::ErrorCode;
use crate::model::context::Context;
use crate::model::id::{Id, IdKind};
use crate::model::task::Task;
use crate::state::State;

/// A command was rejected because its preconditions did not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The referenced task or context does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: IdKind, id: Id },

    /// The identifier is in use, or was used by an entity since deleted.
    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: IdKind, id: Id },

    /// A reorder position does not index the context's current tasks.
    #[error("position {position} out of range for context {context} holding {len} tasks")]
    IndexOutOfRange {
        context: Id,
        position: usize,
        len: usize,
    },
}

impl CommandError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound {
                kind: IdKind::Task,
                ..
            } => ErrorCode::TaskNotFound,
            Self::NotFound {
                kind: IdKind::Context,
                ..
            } => ErrorCode::ContextNotFound,
            Self::AlreadyExists { .. } => ErrorCode::IdAlreadyExists,
            Self::IndexOutOfRange { .. } => ErrorCode::PositionOutOfRange,
        }
    }
}

pub(crate) fn require_task<'a>(state: &'a State, id: &Id) -> Result<&'a Task, CommandError> {
    state.task(id).ok_or_else(|| CommandError::NotFound {
        kind: IdKind::Task,
        id: id.clone(),
    })
}

pub(crate) fn require_context<'a>(state: &'a State, id: &Id) -> Result<&'a Context, CommandError> {
    state.context(id).ok_or_else(|| CommandError::NotFound {
        kind: IdKind::Context,
        id: id.clone(),
    })
}

pub(crate) fn require_position(
    context: &Context,
    position: usize,
) -> Result<(), CommandError> {
    let len = context.task_ids.len();
    if position < len {
        Ok(())
    } else {
        Err(CommandError::IndexOutOfRange {
            context: context.id.clone(),
            position,
            len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_distinguish_task_and_context() {
        let task = CommandError::NotFound {
            kind: IdKind::Task,
            id: Id::new("t"),
        };
        let context = CommandError::NotFound {
            kind: IdKind::Context,
            id: Id::new("c"),
        };
        assert_eq!(task.code(), ErrorCode::TaskNotFound);
        assert_eq!(context.code(), ErrorCode::ContextNotFound);
    }

    #[test]
    fn messages_name_the_entity() {
        let err = CommandError::AlreadyExists {
            kind: IdKind::Context,
            id: Id::new("context:1"),
        };
        assert_eq!(err.to_string(), "context context:1 already exists");

        let err = CommandError::IndexOutOfRange {
            context: Id::new("c1"),
            position: 3,
            len: 3,
        };
        assert!(err.to_string().contains("position 3"));
    }

    #[test]
    fn position_bounds_are_exclusive() {
        let mut context = Context::new(Id::new("c1"), "Home");
        assert!(require_position(&context, 0).is_err());
        context.task_ids.push(Id::new("t1"));
        assert!(require_position(&context, 0).is_ok());
        assert!(require_position(&context, 1).is_err());
    }
}
