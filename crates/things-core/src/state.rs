//! Projected state and the fold that produces it.
//!
//! [`project`] is a pure left fold of [`State::apply`] over an event
//! sequence. The engine keeps a live `State` by applying each appended event
//! once; replaying the full log with `project` must yield an equal value.
//!
//! The projector trusts the log: referential integrity is checked by the
//! command layer before events are emitted and by
//! [`validate::check_log`](crate::validate::check_log) when a stored log is
//! loaded. `apply` never panics, though. An event that would dangle a
//! reference, duplicate a membership, or index past the end of a context is
//! logged and ignored.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{trace, warn};

use crate::event::Event;
use crate::model::context::Context;
use crate::model::id::Id;
use crate::model::task::Task;

/// Current tasks and contexts, derived from the event log.
///
/// Disposable: it can always be rebuilt with [`project`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct State {
    pub tasks: BTreeMap<Id, Task>,
    pub contexts: BTreeMap<Id, Context>,
    #[serde(skip)]
    task_order: Vec<Id>,
    #[serde(skip)]
    context_order: Vec<Id>,
}

/// A broken structural invariant found by [`State::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    #[error("context {context} references missing task {task}")]
    DanglingMember { context: Id, task: Id },

    #[error("context {context} lists task {task} more than once")]
    DuplicateMember { context: Id, task: Id },

    #[error("task {task} belongs to {count} contexts")]
    MultipleContexts { task: Id, count: usize },
}

impl State {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.contexts.is_empty()
    }

    #[must_use]
    pub fn task(&self, id: &Id) -> Option<&Task> {
        self.tasks.get(id)
    }

    #[must_use]
    pub fn context(&self, id: &Id) -> Option<&Context> {
        self.contexts.get(id)
    }

    /// Tasks in the order they were created.
    pub fn tasks_in_creation_order(&self) -> impl Iterator<Item = &Task> {
        self.task_order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Contexts in the order they were created.
    pub fn contexts_in_creation_order(&self) -> impl Iterator<Item = &Context> {
        self.context_order.iter().filter_map(|id| self.contexts.get(id))
    }

    /// Every context whose membership lists `task_id`.
    pub fn contexts_containing<'a>(
        &'a self,
        task_id: &'a Id,
    ) -> impl Iterator<Item = &'a Context> {
        self.contexts_in_creation_order()
            .filter(move |context| context.contains(task_id))
    }

    /// Fold one event into the state.
    pub fn apply(&mut self, event: &Event) {
        trace!(%event, "apply");
        match event {
            Event::TaskCreated { task_id, name } => {
                if self.tasks.contains_key(task_id) {
                    warn!(%task_id, "task_created for existing task; ignored");
                    return;
                }
                self.tasks
                    .insert(task_id.clone(), Task::new(task_id.clone(), name.clone()));
                self.task_order.push(task_id.clone());
            }
            Event::TaskRenamed { task_id, name } => {
                if let Some(task) = self.task_mut(task_id, event) {
                    task.name.clone_from(name);
                }
            }
            Event::TaskChecked { task_id } => {
                if let Some(task) = self.task_mut(task_id, event) {
                    task.checked = true;
                }
            }
            Event::TaskUnchecked { task_id } => {
                if let Some(task) = self.task_mut(task_id, event) {
                    task.checked = false;
                }
            }
            Event::TaskDueDateSet { task_id, due_date } => {
                if let Some(task) = self.task_mut(task_id, event) {
                    task.due_date = Some(*due_date);
                }
            }
            Event::TaskDueDateUnset { task_id } => {
                if let Some(task) = self.task_mut(task_id, event) {
                    task.due_date = None;
                }
            }
            Event::TaskDeleted { task_id } => {
                if self.tasks.remove(task_id).is_none() {
                    warn!(%task_id, "task_deleted for missing task; ignored");
                    return;
                }
                self.task_order.retain(|id| id != task_id);
                // Logs from before compensating detaches were emitted can
                // still hold membership here.
                for context in self.contexts.values_mut() {
                    context.task_ids.retain(|id| id != task_id);
                }
            }
            Event::ContextCreated { context_id, name } => {
                if self.contexts.contains_key(context_id) {
                    warn!(%context_id, "context_created for existing context; ignored");
                    return;
                }
                self.contexts.insert(
                    context_id.clone(),
                    Context::new(context_id.clone(), name.clone()),
                );
                self.context_order.push(context_id.clone());
            }
            Event::ContextRenamed { context_id, name } => {
                if let Some(context) = self.context_mut(context_id, event) {
                    context.name.clone_from(name);
                }
            }
            Event::ContextDeleted { context_id } => {
                if self.contexts.remove(context_id).is_none() {
                    warn!(%context_id, "context_deleted for missing context; ignored");
                    return;
                }
                self.context_order.retain(|id| id != context_id);
            }
            Event::TaskAttachedToContext {
                task_id,
                context_id,
            } => {
                if !self.tasks.contains_key(task_id) {
                    warn!(%task_id, %context_id, "attach of missing task; ignored");
                    return;
                }
                if let Some(context) = self.context_mut(context_id, event) {
                    if context.contains(task_id) {
                        warn!(%task_id, %context_id, "task already attached; ignored");
                    } else {
                        context.task_ids.push(task_id.clone());
                    }
                }
            }
            Event::TaskDetachedFromContext {
                task_id,
                context_id,
            } => {
                if let Some(context) = self.context_mut(context_id, event) {
                    match context.position(task_id) {
                        Some(pos) => {
                            context.task_ids.remove(pos);
                        }
                        None => warn!(%task_id, %context_id, "detach of non-member; ignored"),
                    }
                }
            }
            Event::TaskReorderedInContext {
                context_id,
                old_position,
                new_position,
            } => {
                if let Some(context) = self.context_mut(context_id, event) {
                    let len = context.task_ids.len();
                    if *old_position >= len || *new_position >= len {
                        warn!(
                            %context_id,
                            old_position,
                            new_position,
                            len,
                            "reorder out of range; ignored"
                        );
                        return;
                    }
                    let moved = context.task_ids.remove(*old_position);
                    context.task_ids.insert(*new_position, moved);
                }
            }
        }
    }

    /// Check the structural invariants every reachable state satisfies.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut owners: BTreeMap<&Id, usize> = BTreeMap::new();
        for context in self.contexts.values() {
            for (i, task) in context.task_ids.iter().enumerate() {
                if !self.tasks.contains_key(task) {
                    return Err(InvariantError::DanglingMember {
                        context: context.id.clone(),
                        task: task.clone(),
                    });
                }
                if context.task_ids[..i].contains(task) {
                    return Err(InvariantError::DuplicateMember {
                        context: context.id.clone(),
                        task: task.clone(),
                    });
                }
                *owners.entry(task).or_default() += 1;
            }
        }
        if let Some((task, count)) = owners.into_iter().find(|(_, count)| *count > 1) {
            return Err(InvariantError::MultipleContexts {
                task: task.clone(),
                count,
            });
        }
        Ok(())
    }

    fn task_mut(&mut self, task_id: &Id, event: &Event) -> Option<&mut Task> {
        let task = self.tasks.get_mut(task_id);
        if task.is_none() {
            warn!(
                %task_id,
                event_type = %event.event_type(),
                "event for missing task; ignored"
            );
        }
        task
    }

    fn context_mut(&mut self, context_id: &Id, event: &Event) -> Option<&mut Context> {
        let context = self.contexts.get_mut(context_id);
        if context.is_none() {
            warn!(
                %context_id,
                event_type = %event.event_type(),
                "event for missing context; ignored"
            );
        }
        context
    }
}

/// Fold an event sequence into a fresh [`State`].
#[must_use]
pub fn project<'a>(events: impl IntoIterator<Item = &'a Event>) -> State {
    let mut state = State::new();
    for event in events {
        state.apply(event);
    }
    state
}
