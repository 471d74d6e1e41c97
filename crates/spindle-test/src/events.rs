//! Shared event log for asserting dispatch order.

use parking_lot::Mutex;
use std::sync::Arc;

/// An append-only, cloneable log of events.
///
/// Clones share the same underlying list, so one log can be handed to every
/// middleware in a pipeline and inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    /// Returns a snapshot of all events in order.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Removes all events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Asserts the log equals the onion trace of `labels`.
    ///
    /// # Panics
    ///
    /// Panics if the logged events differ from [`onion`]`(labels)`.
    #[track_caller]
    pub fn assert_onion(&self, labels: &[&str]) {
        assert_eq!(self.events(), onion(labels), "unexpected dispatch order");
    }
}

/// Returns the events [`recording`](crate::recording) middleware produce
/// when `labels` run in order and every one calls `next`.
///
/// `onion(&["A", "B"])` is `["enterA", "enterB", "exitB", "exitA"]`.
#[must_use]
pub fn onion(labels: &[&str]) -> Vec<String> {
    labels
        .iter()
        .map(|label| format!("enter{label}"))
        .chain(labels.iter().rev().map(|label| format!("exit{label}")))
        .collect()
}
