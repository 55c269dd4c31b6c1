//! Consistency check for a decoded log before it is replayed.
//!
//! A log that decodes cleanly can still be inconsistent if it was edited by
//! hand or written by a buggy build: an attach to a context that never
//! existed, a reorder past the end, an id created twice. [`check_log`] replays
//! the events against a scratch [`State`] and checks, per event, what the
//! command layer would have checked before emitting it.
//!
//! Two allowances keep logs from older builds loadable: deleting a task that
//! is still attached, and deleting a context that still holds tasks. The
//! projector drops those memberships itself.

use std::collections::HashSet;

use crate::error::ErrorCode;
use crate::event::{Event, EventType};
use crate::model::id::Id;
use crate::state::State;

/// Why an event could not have been emitted at its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("task {0} does not exist")]
    MissingTask(Id),

    #[error("context {0} does not exist")]
    MissingContext(Id),

    #[error("identifier {0} was already used")]
    IdReused(Id),

    #[error("task {task} is already attached to context {context}")]
    AlreadyAttached { task: Id, context: Id },

    #[error("task {task} is not attached to context {context}")]
    NotAttached { task: Id, context: Id },

    #[error("position {position} out of range for context {context} holding {len} tasks")]
    PositionOutOfRange {
        context: Id,
        position: usize,
        len: usize,
    },
}

/// The first inconsistent event of a log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event {index} ({event_type}): {violation}")]
pub struct ValidationError {
    /// 0-based position of the offending event.
    pub index: usize,
    pub event_type: EventType,
    pub violation: Violation,
}

impl ValidationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InconsistentLog
    }
}

/// Check that every event's preconditions hold at its position.
///
/// # Errors
///
/// Returns the first [`ValidationError`].
pub fn check_log(events: &[Event]) -> Result<(), ValidationError> {
    let mut state = State::new();
    let mut used: HashSet<&Id> = HashSet::new();

    for (index, event) in events.iter().enumerate() {
        check_event(&state, &used, event).map_err(|violation| ValidationError {
            index,
            event_type: event.event_type(),
            violation,
        })?;
        match event {
            Event::TaskCreated { task_id, .. } => {
                used.insert(task_id);
            }
            Event::ContextCreated { context_id, .. } => {
                used.insert(context_id);
            }
            _ => {}
        }
        state.apply(event);
    }
    Ok(())
}

fn check_event(state: &State, used: &HashSet<&Id>, event: &Event) -> Result<(), Violation> {
    let task = |id: &Id| {
        if state.tasks.contains_key(id) {
            Ok(())
        } else {
            Err(Violation::MissingTask(id.clone()))
        }
    };
    let context = |id: &Id| {
        state
            .context(id)
            .ok_or_else(|| Violation::MissingContext(id.clone()))
    };

    match event {
        Event::TaskCreated { task_id: id, .. } | Event::ContextCreated { context_id: id, .. } => {
            if used.contains(id) {
                return Err(Violation::IdReused(id.clone()));
            }
            Ok(())
        }
        Event::TaskRenamed { task_id, .. }
        | Event::TaskChecked { task_id }
        | Event::TaskUnchecked { task_id }
        | Event::TaskDueDateSet { task_id, .. }
        | Event::TaskDueDateUnset { task_id }
        | Event::TaskDeleted { task_id } => task(task_id),
        Event::ContextRenamed { context_id, .. } | Event::ContextDeleted { context_id } => {
            context(context_id).map(|_| ())
        }
        Event::TaskAttachedToContext {
            task_id,
            context_id,
        } => {
            task(task_id)?;
            context(context_id)?;
            if let Some(owner) = state.contexts_containing(task_id).next() {
                return Err(Violation::AlreadyAttached {
                    task: task_id.clone(),
                    context: owner.id.clone(),
                });
            }
            Ok(())
        }
        Event::TaskDetachedFromContext {
            task_id,
            context_id,
        } => {
            if context(context_id)?.contains(task_id) {
                Ok(())
            } else {
                Err(Violation::NotAttached {
                    task: task_id.clone(),
                    context: context_id.clone(),
                })
            }
        }
        Event::TaskReorderedInContext {
            context_id,
            old_position,
            new_position,
        } => {
            let len = context(context_id)?.task_ids.len();
            for &position in [old_position, new_position] {
                if position >= len {
                    return Err(Violation::PositionOutOfRange {
                        context: context_id.clone(),
                        position,
                        len,
                    });
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Id {
        Id::new(s)
    }

    fn base() -> Vec<Event> {
        vec![
            Event::ContextCreated {
                context_id: id("c1"),
                name: "Home".into(),
            },
            Event::TaskCreated {
                task_id: id("t1"),
                name: "a".into(),
            },
            Event::TaskAttachedToContext {
                task_id: id("t1"),
                context_id: id("c1"),
            },
        ]
    }

    #[test]
    fn consistent_log_passes() {
        assert_eq!(check_log(&base()), Ok(()));
        assert_eq!(check_log(&[]), Ok(()));
    }

    #[test]
    fn attach_to_unknown_context_is_flagged() {
        let mut events = base();
        events.push(Event::TaskAttachedToContext {
            task_id: id("t1"),
            context_id: id("c9"),
        });
        let err = check_log(&events).unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.violation, Violation::MissingContext(id("c9")));
    }

    #[test]
    fn second_attach_is_flagged() {
        let mut events = base();
        events.push(Event::ContextCreated {
            context_id: id("c2"),
            name: "Work".into(),
        });
        events.push(Event::TaskAttachedToContext {
            task_id: id("t1"),
            context_id: id("c2"),
        });
        let err = check_log(&events).unwrap_err();
        assert_eq!(
            err.violation,
            Violation::AlreadyAttached {
                task: id("t1"),
                context: id("c1")
            }
        );
    }

    #[test]
    fn reused_id_is_flagged_even_after_delete() {
        let mut events = base();
        events.push(Event::TaskDeleted { task_id: id("t1") });
        events.push(Event::TaskCreated {
            task_id: id("t1"),
            name: "again".into(),
        });
        let err = check_log(&events).unwrap_err();
        assert_eq!(err.index, 4);
        assert_eq!(err.violation, Violation::IdReused(id("t1")));
    }

    #[test]
    fn reorder_past_end_is_flagged() {
        let mut events = base();
        events.push(Event::TaskReorderedInContext {
            context_id: id("c1"),
            old_position: 0,
            new_position: 1,
        });
        let err = check_log(&events).unwrap_err();
        assert!(matches!(
            err.violation,
            Violation::PositionOutOfRange { position: 1, len: 1, .. }
        ));
        assert_eq!(err.code(), ErrorCode::InconsistentLog);
    }

    #[test]
    fn detach_of_non_member_is_flagged() {
        let mut events = base();
        events.push(Event::TaskDetachedFromContext {
            task_id: id("t1"),
            context_id: id("c1"),
        });
        events.push(Event::TaskDetachedFromContext {
            task_id: id("t1"),
            context_id: id("c1"),
        });
        let err = check_log(&events).unwrap_err();
        assert_eq!(err.index, 4);
    }

    #[test]
    fn legacy_delete_without_detach_is_accepted() {
        let mut events = base();
        events.push(Event::ContextDeleted {
            context_id: id("c1"),
        });
        events.push(Event::TaskDeleted { task_id: id("t1") });
        assert_eq!(check_log(&events), Ok(()));
    }
}
