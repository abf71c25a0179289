// Padmap Flush Batch
// Pending events and the ordered batch one flush window releases

use indexmap::IndexSet;

use super::clock::Timestamp;
use crate::control::{ControlIdentity, ControlValue};

/// A transition waiting in the coalescing buffer.
///
/// Created on push, never mutated; a deferred event keeps its original
/// `enqueued_at` until it is finally released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEvent {
    pub identity: ControlIdentity,
    pub value: ControlValue,
    pub enqueued_at: Timestamp,
}

impl PendingEvent {
    pub fn new(identity: ControlIdentity, value: ControlValue, enqueued_at: Timestamp) -> Self {
        Self {
            identity,
            value,
            enqueued_at,
        }
    }
}

/// Events released by one flush, in original push order.
///
/// Holds at most one event per [`ControlIdentity`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushBatch {
    events: Vec<PendingEvent>,
}

impl FlushBatch {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, event: PendingEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEvent> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[PendingEvent] {
        &self.events
    }

    /// Distinct device indices touched by this batch, in first-touched order
    pub fn devices(&self) -> IndexSet<usize> {
        self.events.iter().map(|e| e.identity.device_index).collect()
    }

    /// Check if the batch already holds an event for `identity`
    pub fn contains(&self, identity: &ControlIdentity) -> bool {
        self.events.iter().any(|e| &e.identity == identity)
    }

    pub fn into_vec(self) -> Vec<PendingEvent> {
        self.events
    }
}

impl AsRef<[PendingEvent]> for FlushBatch {
    fn as_ref(&self) -> &[PendingEvent] {
        &self.events
    }
}

impl IntoIterator for FlushBatch {
    type Item = PendingEvent;
    type IntoIter = std::vec::IntoIter<PendingEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
