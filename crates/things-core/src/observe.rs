//! Explicit change subscriptions.
//!
//! After every successful command the engine calls each subscriber once, in
//! subscription order, with the updated state and the events that command
//! appended. Subscribers only ever see state after a command has fully
//! completed. They get shared references, so they cannot issue commands
//! from inside a notification.

use std::fmt;

use crate::event::Event;
use crate::state::State;

/// Handle returned by [`Observers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// What a single command changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change<'a> {
    /// Events appended by the command, in order.
    pub events: &'a [Event],
    /// Log length after the append.
    pub log_len: usize,
}

type Callback = Box<dyn FnMut(&State, &Change<'_>)>;

/// Registry of change subscribers.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback)>,
}

impl Observers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&State, &Change<'_>) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn notify(&mut self, state: &State, change: &Change<'_>) {
        for (_, callback) in &mut self.subscribers {
            callback(state, change);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}
