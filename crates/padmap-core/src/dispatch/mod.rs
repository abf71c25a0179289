// Padmap Dispatch
// Immediate or coalesced delivery of transitions to the output sink

mod dispatcher;
mod scheduler;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::output::OutputSink;

/// Sink shared between the producer (immediate mode) and the flush thread
pub type SharedSink = Arc<Mutex<Box<dyn OutputSink>>>;

pub use dispatcher::{DispatchConfig, Dispatcher};
pub use scheduler::{flush_and_apply, FlushScheduler, DEFAULT_TICK};
