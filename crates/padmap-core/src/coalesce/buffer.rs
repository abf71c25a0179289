// Padmap Coalescing Buffer
// Shared pending-event queue with window-based flush and same-control deferral

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::batch::{FlushBatch, PendingEvent};
use super::clock::{Clock, Timestamp};
use crate::control::{ControlIdentity, ControlValue};

/// Default cap on buffered events before the oldest one is dropped
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// Buffer between the input producer and the flush consumer.
///
/// `push` and `flush` are the only mutation points and each holds the lock
/// for a bounded, allocation-light critical section. Output Sink calls never
/// happen under this lock: `flush` hands back an owned [`FlushBatch`].
///
/// Window rule: a flush is a no-op until `flush_interval` has elapsed since
/// the oldest pending event (the anchor). When the window closes the anchor
/// is released, followed by every later event that arrived inside the window
/// and whose control has not been decided yet this round. Everything else is
/// deferred, keeping its original order and timestamp.
pub struct CoalescingBuffer {
    pending: Mutex<VecDeque<PendingEvent>>,
    flush_interval: Duration,
    /// 0 means unbounded
    max_pending: usize,
    clock: Arc<dyn Clock>,
}

impl CoalescingBuffer {
    pub fn new(flush_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            flush_interval,
            max_pending: DEFAULT_MAX_PENDING,
            clock,
        }
    }

    /// Set the overflow cap (0 disables it)
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Append a transition stamped with the current time.
    ///
    /// The timestamp is taken inside the critical section so arrival order
    /// and timestamp order always agree.
    pub fn push(&self, identity: ControlIdentity, value: ControlValue) {
        let mut pending = self.pending.lock();
        let event = PendingEvent::new(identity, value, self.clock.now());

        if self.max_pending > 0 && pending.len() >= self.max_pending {
            if let Some(dropped) = pending.pop_front() {
                log::warn!(
                    "coalescing buffer full ({} events), dropping oldest: {} = {} @ {}",
                    self.max_pending,
                    dropped.identity,
                    dropped.value,
                    dropped.enqueued_at
                );
            }
        }

        pending.push_back(event);
    }

    /// Release the events of the window anchored at the oldest pending event.
    ///
    /// Returns an empty batch, leaving the buffer untouched, when nothing is
    /// pending or the window is still open at `now`.
    pub fn flush(&self, now: Timestamp) -> FlushBatch {
        let mut pending = self.pending.lock();
        partition_window(&mut pending, now, self.flush_interval)
    }

    /// Release everything that is pending, one window at a time.
    ///
    /// Windows are treated as closed, but the per-control rule still holds:
    /// each returned batch carries at most one event per control, so a press
    /// and its release end up in consecutive batches.
    pub fn drain(&self) -> Vec<FlushBatch> {
        let mut pending = self.pending.lock();
        let mut batches = Vec::new();
        while !pending.is_empty() {
            batches.push(partition_window(&mut pending, Timestamp::MAX, self.flush_interval));
        }
        batches
    }

    /// Drop every pending event, returning how many were discarded
    pub fn discard(&self) -> usize {
        let mut pending = self.pending.lock();
        let count = pending.len();
        pending.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Copy of the pending events in buffer order
    pub fn snapshot(&self) -> Vec<PendingEvent> {
        self.pending.lock().iter().copied().collect()
    }
}

impl std::fmt::Debug for CoalescingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescingBuffer")
            .field("pending", &self.len())
            .field("flush_interval", &self.flush_interval)
            .field("max_pending", &self.max_pending)
            .finish()
    }
}

/// Split `pending` into the batch released now and the deferred remainder.
///
/// Deferred events are written back into `pending`, which is empty once the
/// snapshot is taken, so they keep their relative order at the head.
fn partition_window(
    pending: &mut VecDeque<PendingEvent>,
    now: Timestamp,
    flush_interval: Duration,
) -> FlushBatch {
    let anchor = match pending.front() {
        Some(oldest) => oldest.enqueued_at,
        None => return FlushBatch::new(),
    };

    if now.saturating_since(anchor) < flush_interval {
        return FlushBatch::new();
    }

    let snapshot = std::mem::take(pending);
    let mut batch = FlushBatch::with_capacity(snapshot.len());
    let mut decided: HashSet<ControlIdentity> = HashSet::with_capacity(snapshot.len());

    let mut events = snapshot.into_iter();
    // The anchor always survives its own window
    if let Some(oldest) = events.next() {
        decided.insert(oldest.identity);
        batch.push(oldest);
    }

    for event in events {
        if event.enqueued_at.saturating_since(anchor) > flush_interval {
            log::trace!("late for window @ {}: {} deferred", anchor, event.identity);
            pending.push_back(event);
        } else if decided.contains(&event.identity) {
            log::trace!("repeat in window @ {}: {} = {} deferred", anchor, event.identity, event.value);
            pending.push_back(event);
        } else {
            decided.insert(event.identity);
            batch.push(event);
        }
    }

    batch
}
