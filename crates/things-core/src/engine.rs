//! The command layer: one [`Engine`] owns the event log, the live state and
//! the change subscribers.
//!
//! Each command
//!
//! 1. checks its preconditions against the current state,
//! 2. appends its events to the log and folds them into the state,
//! 3. notifies subscribers once, after the last event is applied.
//!
//! A failed precondition returns a [`CommandError`] before step 2, so a
//! rejected command never leaves a partial trace in the log.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::command::{CommandError, require_context, require_position, require_task};
use crate::event::Event;
use crate::log::EventLog;
use crate::model::id::{Id, IdKind};
use crate::observe::{Change, Observers, SubscriptionId};
use crate::state::{State, project};
use crate::validate::{ValidationError, check_log};

/// Events appended by a successful command.
pub type Emitted = Vec<Event>;

/// Single-writer application engine.
#[derive(Debug, Default)]
pub struct Engine {
    log: EventLog,
    state: State,
    used_ids: HashSet<Id>,
    observers: Observers,
}

impl Engine {
    /// An engine with an empty log and empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an engine by replaying a stored event sequence in order.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the sequence could not have been
    /// produced by the command layer; nothing is replayed in that case.
    pub fn replay(events: Vec<Event>) -> Result<Self, ValidationError> {
        check_log(&events)?;
        let mut engine = Self::new();
        let count = events.len();
        for event in events {
            engine.append(event);
        }
        info!(events = count, "replayed event log");
        Ok(engine)
    }

    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }

    #[must_use]
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    /// Recompute state from the full log, independent of the live state.
    #[must_use]
    pub fn project(&self) -> State {
        project(&self.log)
    }

    /// A fresh identifier never used in this log.
    #[must_use]
    pub fn new_id(&self, kind: IdKind) -> Id {
        loop {
            let id = Id::generate(kind);
            if !self.used_ids.contains(&id) {
                return id;
            }
        }
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&State, &Change<'_>) + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    /// Returns `false` if the subscription was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// [`CommandError::AlreadyExists`] if `id` names a task or context, now
    /// or in the past.
    pub fn create_task(
        &mut self,
        id: Id,
        name: impl Into<String>,
    ) -> Result<Emitted, CommandError> {
        self.require_unused(&id, IdKind::Task)?;
        Ok(self.commit(vec![Event::TaskCreated {
            task_id: id,
            name: name.into(),
        }]))
    }

    /// # Errors
    ///
    /// [`CommandError::NotFound`] if the task does not exist.
    pub fn rename_task(
        &mut self,
        id: &Id,
        name: impl Into<String>,
    ) -> Result<Emitted, CommandError> {
        require_task(&self.state, id)?;
        Ok(self.commit(vec![Event::TaskRenamed {
            task_id: id.clone(),
            name: name.into(),
        }]))
    }

    /// Move a task into `context`, or out of every context when `None`.
    ///
    /// Emits a detach for each context currently holding the task, then one
    /// attach if a target is given. A task that already sits in the target is
    /// detached and re-attached, which moves it to the end.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotFound`] if the task or the target context does not
    /// exist.
    pub fn set_task_context(
        &mut self,
        task_id: &Id,
        context: Option<&Id>,
    ) -> Result<Emitted, CommandError> {
        require_task(&self.state, task_id)?;
        if let Some(context_id) = context {
            require_context(&self.state, context_id)?;
        }

        let mut events = self.detach_all(task_id);
        if let Some(context_id) = context {
            events.push(Event::TaskAttachedToContext {
                task_id: task_id.clone(),
                context_id: context_id.clone(),
            });
        }
        Ok(self.commit(events))
    }

    /// Mark a task done (`check = true`) or not done.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotFound`] if the task does not exist.
    pub fn check_task(&mut self, id: &Id, check: bool) -> Result<Emitted, CommandError> {
        require_task(&self.state, id)?;
        let task_id = id.clone();
        let event = if check {
            Event::TaskChecked { task_id }
        } else {
            Event::TaskUnchecked { task_id }
        };
        Ok(self.commit(vec![event]))
    }

    /// Set or clear a task's due date.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotFound`] if the task does not exist.
    pub fn set_task_due_date(
        &mut self,
        id: &Id,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Emitted, CommandError> {
        require_task(&self.state, id)?;
        let task_id = id.clone();
        let event = match due_date {
            Some(due_date) => Event::TaskDueDateSet { task_id, due_date },
            None => Event::TaskDueDateUnset { task_id },
        };
        Ok(self.commit(vec![event]))
    }

    /// Delete a task, detaching it from its context first.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotFound`] if the task does not exist.
    pub fn delete_task(&mut self, id: &Id) -> Result<Emitted, CommandError> {
        require_task(&self.state, id)?;
        let mut events = self.detach_all(id);
        events.push(Event::TaskDeleted {
            task_id: id.clone(),
        });
        Ok(self.commit(events))
    }

    // -----------------------------------------------------------------------
    // Contexts
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// [`CommandError::AlreadyExists`] if `id` names a task or context, now
    /// or in the past.
    pub fn create_context(
        &mut self,
        id: Id,
        name: impl Into<String>,
    ) -> Result<Emitted, CommandError> {
        self.require_unused(&id, IdKind::Context)?;
        Ok(self.commit(vec![Event::ContextCreated {
            context_id: id,
            name: name.into(),
        }]))
    }

    /// # Errors
    ///
    /// [`CommandError::NotFound`] if the context does not exist.
    pub fn rename_context(
        &mut self,
        id: &Id,
        name: impl Into<String>,
    ) -> Result<Emitted, CommandError> {
        require_context(&self.state, id)?;
        Ok(self.commit(vec![Event::ContextRenamed {
            context_id: id.clone(),
            name: name.into(),
        }]))
    }

    /// Delete a context. Its tasks survive, detached.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotFound`] if the context does not exist.
    pub fn delete_context(&mut self, id: &Id) -> Result<Emitted, CommandError> {
        let context = require_context(&self.state, id)?;
        let mut events: Vec<Event> = context
            .task_ids
            .iter()
            .map(|task_id| Event::TaskDetachedFromContext {
                task_id: task_id.clone(),
                context_id: id.clone(),
            })
            .collect();
        events.push(Event::ContextDeleted {
            context_id: id.clone(),
        });
        Ok(self.commit(events))
    }

    /// Move the task at `old_position` to `new_position`, shifting the tasks
    /// in between.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotFound`] if the context does not exist,
    /// [`CommandError::IndexOutOfRange`] if either position is not a valid
    /// index into its current tasks. Positions are never clamped.
    pub fn reorder_task_in_context(
        &mut self,
        context_id: &Id,
        old_position: usize,
        new_position: usize,
    ) -> Result<Emitted, CommandError> {
        let context = require_context(&self.state, context_id)?;
        require_position(context, old_position)?;
        require_position(context, new_position)?;
        Ok(self.commit(vec![Event::TaskReorderedInContext {
            context_id: context_id.clone(),
            old_position,
            new_position,
        }]))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require_unused(&self, id: &Id, kind: IdKind) -> Result<(), CommandError> {
        if self.used_ids.contains(id) {
            return Err(CommandError::AlreadyExists {
                kind,
                id: id.clone(),
            });
        }
        Ok(())
    }

    fn detach_all(&self, task_id: &Id) -> Vec<Event> {
        self.state
            .contexts_containing(task_id)
            .map(|context| Event::TaskDetachedFromContext {
                task_id: task_id.clone(),
                context_id: context.id.clone(),
            })
            .collect()
    }

    fn append(&mut self, event: Event) {
        match &event {
            Event::TaskCreated { task_id: id, .. }
            | Event::ContextCreated { context_id: id, .. } => {
                self.used_ids.insert(id.clone());
            }
            _ => {}
        }
        self.state.apply(&event);
        self.log.append(event);
    }

    fn commit(&mut self, events: Vec<Event>) -> Emitted {
        let offset = self.log.len();
        for event in &events {
            self.append(event.clone());
        }
        debug!(
            events = events.len(),
            first = events.first().map_or("none", |e| e.event_type().as_str()),
            log_len = self.log.len(),
            "command accepted"
        );
        let change = Change {
            events: self.log.since(offset),
            log_len: self.log.len(),
        };
        self.observers.notify(&self.state, &change);
        events
    }
}
