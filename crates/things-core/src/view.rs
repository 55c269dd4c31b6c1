//! Read-only views over [`State`] for a front end.
//!
//! Nothing here is persisted or evented. A [`Selection`] holds ids, not
//! references, so it survives state changes and resolves to `None` once the
//! selected entity is gone.

use chrono::{DateTime, Utc};

use crate::model::context::Context;
use crate::model::id::Id;
use crate::model::task::Task;
use crate::state::State;

/// Ephemeral UI selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub context: Option<Id>,
    pub task: Option<Id>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn context<'a>(&self, state: &'a State) -> Option<&'a Context> {
        self.context.as_ref().and_then(|id| state.context(id))
    }

    #[must_use]
    pub fn task<'a>(&self, state: &'a State) -> Option<&'a Task> {
        self.task.as_ref().and_then(|id| state.task(id))
    }

    /// Tasks shown for the current context selection.
    #[must_use]
    pub fn task_list<'a>(&self, state: &'a State) -> Vec<&'a Task> {
        task_list(state, self.context(state).map(|c| &c.id))
    }

    /// Forget ids whose entities no longer exist.
    pub fn prune(&mut self, state: &State) {
        if self.context(state).is_none() {
            self.context = None;
        }
        if self.task(state).is_none() {
            self.task = None;
        }
    }
}

/// Tasks of `context` in its order, or every task in creation order when
/// `context` is `None`. An unknown context lists nothing.
#[must_use]
pub fn task_list<'a>(state: &'a State, context: Option<&Id>) -> Vec<&'a Task> {
    match context {
        Some(id) => state.context(id).map_or_else(Vec::new, |context| {
            context
                .task_ids
                .iter()
                .filter_map(|task_id| state.task(task_id))
                .collect()
        }),
        None => state.tasks_in_creation_order().collect(),
    }
}

/// The context holding `task`, if any.
#[must_use]
pub fn context_of<'a>(state: &'a State, task: &Id) -> Option<&'a Context> {
    state
        .contexts_in_creation_order()
        .find(|context| context.contains(task))
}

#[must_use]
pub fn contexts(state: &State) -> Vec<&Context> {
    state.contexts_in_creation_order().collect()
}

/// Unchecked tasks whose due date has passed, in creation order.
#[must_use]
pub fn overdue<'a>(state: &'a State, now: DateTime<Utc>) -> Vec<&'a Task> {
    state
        .tasks_in_creation_order()
        .filter(|task| task.is_overdue(now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use chrono::TimeZone;

    fn id(s: &str) -> Id {
        Id::new(s)
    }

    fn names(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.name.clone()).collect()
    }

    fn sample() -> Engine {
        let mut engine = Engine::new();
        engine.create_context(id("home"), "Home").unwrap();
        engine.create_context(id("work"), "Work").unwrap();
        for (t, name) in [("t1", "dishes"), ("t2", "report"), ("t3", "laundry")] {
            engine.create_task(id(t), name).unwrap();
        }
        engine.set_task_context(&id("t3"), Some(&id("home"))).unwrap();
        engine.set_task_context(&id("t1"), Some(&id("home"))).unwrap();
        engine.set_task_context(&id("t2"), Some(&id("work"))).unwrap();
        engine
    }

    #[test]
    fn task_list_follows_context_order() {
        let engine = sample();
        let home = task_list(engine.state(), Some(&id("home")));
        assert_eq!(names(&home), ["laundry", "dishes"]);
    }

    #[test]
    fn task_list_without_context_is_creation_order() {
        let engine = sample();
        let all = task_list(engine.state(), None);
        assert_eq!(names(&all), ["dishes", "report", "laundry"]);
    }

    #[test]
    fn task_list_of_unknown_context_is_empty() {
        let engine = sample();
        assert!(task_list(engine.state(), Some(&id("gone"))).is_empty());
    }

    #[test]
    fn context_of_finds_holder() {
        let engine = sample();
        assert_eq!(
            context_of(engine.state(), &id("t2")).map(|c| c.name.as_str()),
            Some("Work")
        );
    }

    #[test]
    fn contexts_in_creation_order() {
        let mut engine = sample();
        engine.create_context(id("errands"), "Errands").unwrap();
        let names: Vec<_> = contexts(engine.state()).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Home", "Work", "Errands"]);
    }

    #[test]
    fn selection_resolves_to_none_after_delete() {
        let mut engine = sample();
        let mut selection = Selection {
            context: Some(id("home")),
            task: Some(id("t1")),
        };
        assert_eq!(names(&selection.task_list(engine.state())), ["laundry", "dishes"]);

        engine.delete_context(&id("home")).unwrap();
        engine.delete_task(&id("t1")).unwrap();
        assert!(selection.context(engine.state()).is_none());
        assert!(selection.task(engine.state()).is_none());
        assert_eq!(names(&selection.task_list(engine.state())), ["report", "laundry"]);

        selection.prune(engine.state());
        assert_eq!(selection, Selection::new());
    }

    #[test]
    fn overdue_skips_checked_and_future() {
        let mut engine = sample();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let past = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
        let future = Utc.with_ymd_and_hms(2026, 12, 1, 9, 0, 0).unwrap();
        engine.set_task_due_date(&id("t1"), Some(past)).unwrap();
        engine.set_task_due_date(&id("t2"), Some(past)).unwrap();
        engine.set_task_due_date(&id("t3"), Some(future)).unwrap();
        engine.check_task(&id("t2"), true).unwrap();

        assert_eq!(names(&overdue(engine.state(), now)), ["dishes"]);
    }
}
