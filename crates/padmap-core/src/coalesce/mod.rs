// Padmap Coalescing Engine
// Buffers transitions and releases at most one change per control per window

mod batch;
mod buffer;
mod clock;

pub use batch::{FlushBatch, PendingEvent};
pub use buffer::{CoalescingBuffer, DEFAULT_MAX_PENDING};
pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
