// Padmap Output Sink
// Interface to the virtual pad driver plus in-process sinks

use std::sync::Arc;

use parking_lot::Mutex;

use crate::control::{Axis, Button, Slider};

/// Errors reported by an output sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Device {device_index} unavailable")]
    DeviceUnavailable { device_index: usize },

    #[error("Value {value} does not fit control {control}")]
    ValueMismatch { control: String, value: String },

    #[error("IO error on device {device_index}: {source}")]
    Io {
        device_index: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Renders control state to output devices.
///
/// Setters only stage state; nothing is guaranteed to reach the device until
/// [`OutputSink::submit`] is called for it. Submitting is the expensive part
/// and callers batch it to once per device per flush.
pub trait OutputSink: Send {
    fn set_button_state(&mut self, device_index: usize, button: Button, pressed: bool) -> Result<(), SinkError>;

    fn set_axis_value(&mut self, device_index: usize, axis: Axis, value: i16) -> Result<(), SinkError>;

    fn set_slider_value(&mut self, device_index: usize, slider: Slider, value: u8) -> Result<(), SinkError>;

    fn submit(&mut self, device_index: usize) -> Result<(), SinkError>;
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn set_button_state(&mut self, device_index: usize, button: Button, pressed: bool) -> Result<(), SinkError> {
        (**self).set_button_state(device_index, button, pressed)
    }

    fn set_axis_value(&mut self, device_index: usize, axis: Axis, value: i16) -> Result<(), SinkError> {
        (**self).set_axis_value(device_index, axis, value)
    }

    fn set_slider_value(&mut self, device_index: usize, slider: Slider, value: u8) -> Result<(), SinkError> {
        (**self).set_slider_value(device_index, slider, value)
    }

    fn submit(&mut self, device_index: usize) -> Result<(), SinkError> {
        (**self).submit(device_index)
    }
}

/// One call received by a [`MemorySink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    Button(usize, Button, bool),
    Axis(usize, Axis, i16),
    Slider(usize, Slider, u8),
    Submit(usize),
}

#[derive(Debug, Default)]
struct MemoryState {
    calls: Vec<SinkCall>,
    unavailable: Vec<usize>,
}

/// Sink that records every call in memory.
///
/// Clones share the same record, so a handle kept outside the dispatcher can
/// inspect what the flush thread applied.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call for `device_index` fail with `DeviceUnavailable`
    pub fn set_unavailable(&self, device_index: usize) {
        let mut state = self.state.lock();
        if !state.unavailable.contains(&device_index) {
            state.unavailable.push(device_index);
        }
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.state.lock().calls.clone()
    }

    /// Recorded calls excluding submits
    pub fn applied(&self) -> Vec<SinkCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, SinkCall::Submit(_)))
            .collect()
    }

    /// Device indices in submit order
    pub fn submits(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::Submit(device) => Some(device),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, device_index: usize, call: SinkCall) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.unavailable.contains(&device_index) {
            return Err(SinkError::DeviceUnavailable { device_index });
        }
        state.calls.push(call);
        Ok(())
    }
}

impl OutputSink for MemorySink {
    fn set_button_state(&mut self, device_index: usize, button: Button, pressed: bool) -> Result<(), SinkError> {
        self.record(device_index, SinkCall::Button(device_index, button, pressed))
    }

    fn set_axis_value(&mut self, device_index: usize, axis: Axis, value: i16) -> Result<(), SinkError> {
        self.record(device_index, SinkCall::Axis(device_index, axis, value))
    }

    fn set_slider_value(&mut self, device_index: usize, slider: Slider, value: u8) -> Result<(), SinkError> {
        self.record(device_index, SinkCall::Slider(device_index, slider, value))
    }

    fn submit(&mut self, device_index: usize) -> Result<(), SinkError> {
        self.record(device_index, SinkCall::Submit(device_index))
    }
}

/// Sink that only logs, for dry runs without a virtual device
#[derive(Debug, Default)]
pub struct LoggingSink {
    submitted: u64,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }
}

impl OutputSink for LoggingSink {
    fn set_button_state(&mut self, device_index: usize, button: Button, pressed: bool) -> Result<(), SinkError> {
        log::info!("pad{} {} {}", device_index + 1, button, if pressed { "down" } else { "up" });
        Ok(())
    }

    fn set_axis_value(&mut self, device_index: usize, axis: Axis, value: i16) -> Result<(), SinkError> {
        log::info!("pad{} {} = {}", device_index + 1, axis, value);
        Ok(())
    }

    fn set_slider_value(&mut self, device_index: usize, slider: Slider, value: u8) -> Result<(), SinkError> {
        log::info!("pad{} {} = {}", device_index + 1, slider, value);
        Ok(())
    }

    fn submit(&mut self, device_index: usize) -> Result<(), SinkError> {
        self.submitted += 1;
        log::debug!("pad{} report #{}", device_index + 1, self.submitted);
        Ok(())
    }
}
