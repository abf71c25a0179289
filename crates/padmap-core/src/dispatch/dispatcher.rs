// Padmap Dispatcher
// Routes resolved transitions to the buffer or, in immediate mode, the sink

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::scheduler::{FlushScheduler, DEFAULT_TICK};
use super::SharedSink;
use crate::coalesce::{Clock, CoalescingBuffer, PendingEvent, DEFAULT_MAX_PENDING};
use crate::control::{ControlIdentity, ControlValue};
use crate::output::{apply_event, FlushReport, OutputSink, SinkError};

/// Configuration for the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Coalescing window; zero selects immediate mode
    pub flush_interval: Duration,
    /// Scheduler tick
    pub tick: Duration,
    /// Buffer cap before dropping the oldest event (0 = unbounded)
    pub max_pending: usize,
    /// Apply buffered events when the scheduler stops
    pub drain_on_stop: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::ZERO,
            tick: DEFAULT_TICK,
            max_pending: DEFAULT_MAX_PENDING,
            drain_on_stop: true,
        }
    }
}

impl DispatchConfig {
    pub fn immediate() -> Self {
        Self::default()
    }

    pub fn buffered(flush_interval: Duration) -> Self {
        Self {
            flush_interval,
            ..Self::default()
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.flush_interval.is_zero()
    }
}

enum Mode {
    Immediate,
    Buffered {
        buffer: Arc<CoalescingBuffer>,
        scheduler: FlushScheduler,
        // Set once a started scheduler has been stopped
        stopped: AtomicBool,
    },
}

/// Entry point for resolved transitions.
///
/// Owns the sink, and in buffered mode the coalescing buffer and its flush
/// scheduler. Nothing here is process-global; several dispatchers can run
/// side by side.
pub struct Dispatcher {
    sink: SharedSink,
    clock: Arc<dyn Clock>,
    mode: Mode,
}

impl Dispatcher {
    pub fn new(config: &DispatchConfig, sink: Box<dyn OutputSink>, clock: Arc<dyn Clock>) -> Self {
        let sink: SharedSink = Arc::new(Mutex::new(sink));
        let mode = if config.is_immediate() {
            log::info!("dispatch mode: immediate");
            Mode::Immediate
        } else {
            log::info!("dispatch mode: coalesced, window {:?}", config.flush_interval);
            let buffer = Arc::new(
                CoalescingBuffer::new(config.flush_interval, clock.clone())
                    .with_max_pending(config.max_pending),
            );
            let scheduler = FlushScheduler::new(buffer.clone(), sink.clone(), config.tick)
                .with_drain_on_stop(config.drain_on_stop);
            Mode::Buffered {
                buffer,
                scheduler,
                stopped: AtomicBool::new(false),
            }
        };

        Self { sink, clock, mode }
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self.mode, Mode::Immediate)
    }

    /// The coalescing buffer, absent in immediate mode
    pub fn buffer(&self) -> Option<&Arc<CoalescingBuffer>> {
        match &self.mode {
            Mode::Immediate => None,
            Mode::Buffered { buffer, .. } => Some(buffer),
        }
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Hand a transition to the output side.
    ///
    /// Buffered mode only enqueues and cannot fail. Immediate mode applies
    /// the value and submits its device before returning, so sink errors are
    /// reported to the caller.
    ///
    /// After [`stop_scheduler`](Self::stop_scheduler) buffered transitions
    /// are still enqueued, with a warning, and wait for [`tick`](Self::tick)
    /// or a restarted scheduler.
    pub fn send(&self, identity: ControlIdentity, value: ControlValue) -> Result<(), SinkError> {
        match &self.mode {
            Mode::Buffered { buffer, stopped, .. } => {
                if stopped.load(Ordering::Acquire) {
                    log::warn!("flush scheduler stopped, {} stays buffered until the next tick", identity);
                }
                buffer.push(identity, value);
                Ok(())
            }
            Mode::Immediate => {
                let event = PendingEvent::new(identity, value, self.clock.now());
                let mut sink = self.sink.lock();
                apply_event(&mut **sink, &event)?;
                sink.submit(identity.device_index)
            }
        }
    }

    /// Start the flush scheduler (no-op in immediate mode)
    pub fn start_scheduler(&mut self) -> std::io::Result<bool> {
        match &mut self.mode {
            Mode::Immediate => Ok(false),
            Mode::Buffered { scheduler, stopped, .. } => {
                let started = scheduler.start()?;
                stopped.store(false, Ordering::Release);
                Ok(started)
            }
        }
    }

    /// Stop the flush scheduler and settle buffered events.
    ///
    /// Nothing flushes the buffer afterwards on its own. Later buffered
    /// sends are kept and logged as warnings; call [`tick`](Self::tick) or
    /// restart the scheduler to apply them.
    pub fn stop_scheduler(&mut self) -> FlushReport {
        match &mut self.mode {
            Mode::Immediate => FlushReport::default(),
            Mode::Buffered { scheduler, stopped, .. } => {
                if scheduler.is_running() {
                    stopped.store(true, Ordering::Release);
                }
                scheduler.stop()
            }
        }
    }

    /// Whether a started scheduler has since been stopped
    pub fn is_scheduler_stopped(&self) -> bool {
        match &self.mode {
            Mode::Immediate => false,
            Mode::Buffered { stopped, .. } => stopped.load(Ordering::Acquire),
        }
    }

    pub fn is_scheduler_running(&self) -> bool {
        match &self.mode {
            Mode::Immediate => false,
            Mode::Buffered { scheduler, .. } => scheduler.is_running(),
        }
    }

    /// Run a single flush pass on the calling thread
    pub fn tick(&self) -> FlushReport {
        match &self.mode {
            Mode::Immediate => FlushReport::default(),
            Mode::Buffered { scheduler, .. } => scheduler.tick(),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop_scheduler();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coalesce::ManualClock;
    use crate::control::{Axis, Button};
    use crate::output::{MemorySink, SinkCall};

    #[test]
    fn test_immediate_mode_applies_and_submits() {
        let memory = MemorySink::new();
        let dispatcher = Dispatcher::new(
            &DispatchConfig::immediate(),
            Box::new(memory.clone()),
            Arc::new(ManualClock::new()),
        );
        assert!(dispatcher.is_immediate());
        assert!(dispatcher.buffer().is_none());

        dispatcher
            .send(ControlIdentity::axis(1, Axis::LeftThumbX), ControlValue::Axis(-30000))
            .unwrap();
        assert_eq!(
            memory.calls(),
            vec![SinkCall::Axis(1, Axis::LeftThumbX, -30000), SinkCall::Submit(1)]
        );
    }

    #[test]
    fn test_immediate_mode_reports_unavailable_device() {
        let memory = MemorySink::new();
        memory.set_unavailable(0);
        let dispatcher = Dispatcher::new(
            &DispatchConfig::immediate(),
            Box::new(memory.clone()),
            Arc::new(ManualClock::new()),
        );
        let result = dispatcher.send(ControlIdentity::button(0, Button::A), ControlValue::Button(true));
        assert!(matches!(result, Err(SinkError::DeviceUnavailable { device_index: 0 })));
    }

    #[test]
    fn test_buffered_mode_defers_to_tick() {
        let memory = MemorySink::new();
        let clock = Arc::new(ManualClock::new());
        let dispatcher = Dispatcher::new(
            &DispatchConfig::buffered(Duration::from_millis(10)),
            Box::new(memory.clone()),
            clock.clone(),
        );
        assert!(!dispatcher.is_immediate());

        dispatcher
            .send(ControlIdentity::button(0, Button::Y), ControlValue::Button(true))
            .unwrap();
        assert!(memory.calls().is_empty());
        assert_eq!(dispatcher.buffer().map(|b| b.len()), Some(1));

        clock.set(10);
        dispatcher.tick();
        assert_eq!(memory.calls(), vec![SinkCall::Button(0, Button::Y, true), SinkCall::Submit(0)]);
    }

    #[test]
    fn test_send_after_stop_stays_buffered_until_tick() {
        let memory = MemorySink::new();
        let clock = Arc::new(ManualClock::new());
        let mut dispatcher = Dispatcher::new(
            &DispatchConfig::buffered(Duration::from_millis(10)),
            Box::new(memory.clone()),
            clock.clone(),
        );
        assert!(!dispatcher.is_scheduler_stopped());

        assert!(dispatcher.start_scheduler().unwrap());
        dispatcher.stop_scheduler();
        assert!(!dispatcher.is_scheduler_running());
        assert!(dispatcher.is_scheduler_stopped());

        dispatcher
            .send(ControlIdentity::button(0, Button::B), ControlValue::Button(true))
            .unwrap();
        assert_eq!(dispatcher.buffer().map(|b| b.len()), Some(1));
        assert!(memory.calls().is_empty());

        clock.set(10);
        let report = dispatcher.tick();
        assert_eq!(report.applied, 1);
        assert_eq!(memory.calls(), vec![SinkCall::Button(0, Button::B, true), SinkCall::Submit(0)]);

        assert!(dispatcher.start_scheduler().unwrap());
        assert!(!dispatcher.is_scheduler_stopped());
    }

    #[test]
    fn test_immediate_mode_has_no_scheduler() {
        let mut dispatcher = Dispatcher::new(
            &DispatchConfig::immediate(),
            Box::new(MemorySink::new()),
            Arc::new(ManualClock::new()),
        );
        assert!(!dispatcher.start_scheduler().unwrap());
        assert!(!dispatcher.is_scheduler_running());
    }
}
