//! Append-only in-memory event log.
//!
//! The log does not validate anything: validation happens in the command
//! layer before an event is appended, and in
//! [`validate`](crate::validate) before a stored log is replayed.

use crate::event::Event;

/// Ordered, append-only sequence of events. Iteration order is append order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event. Never fails.
    pub fn append(&mut self, event: Event) {
        self.events.push(event);
    }

    /// All events, in append order.
    #[must_use]
    pub fn all(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events appended at or after `offset`.
    #[must_use]
    pub fn since(&self, offset: usize) -> &[Event] {
        self.events.get(offset..).unwrap_or_default()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
