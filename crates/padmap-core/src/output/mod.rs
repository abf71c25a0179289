// Padmap Output Layer
// Output sinks and batched application of released events

mod apply;
mod sink;

#[cfg(feature = "uinput")]
mod uinput;

pub use apply::{apply_batch, apply_event, FlushReport};
pub use sink::{LoggingSink, MemorySink, OutputSink, SinkCall, SinkError};

#[cfg(feature = "uinput")]
pub use uinput::VirtualPadSink;
