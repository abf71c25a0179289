// Padmap Flush Scheduler
// Worker thread that flushes the coalescing buffer on a fixed tick

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::SharedSink;
use crate::coalesce::{CoalescingBuffer, Timestamp};
use crate::output::{apply_batch, FlushReport};

/// Default scheduler tick
pub const DEFAULT_TICK: Duration = Duration::from_millis(2);

/// Run one flush at `now` and apply whatever it released.
///
/// The buffer lock is released before the sink is locked, so producers never
/// wait behind a slow device.
pub fn flush_and_apply(buffer: &CoalescingBuffer, sink: &SharedSink, now: Timestamp) -> FlushReport {
    let batch = buffer.flush(now);
    if batch.is_empty() {
        return FlushReport::default();
    }

    log::trace!("window released {} event(s) for {} pad(s)", batch.len(), batch.devices().len());
    let mut sink = sink.lock();
    apply_batch(&mut **sink, batch.as_slice())
}

/// Periodic consumer of a [`CoalescingBuffer`].
///
/// The tick is independent of the flush interval and normally much shorter;
/// the buffer's own window check decides when anything is released.
pub struct FlushScheduler {
    buffer: Arc<CoalescingBuffer>,
    sink: SharedSink,
    tick: Duration,
    drain_on_stop: bool,
    running: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl FlushScheduler {
    pub fn new(buffer: Arc<CoalescingBuffer>, sink: SharedSink, tick: Duration) -> Self {
        Self {
            buffer,
            sink,
            tick,
            drain_on_stop: true,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Choose whether `stop` applies or discards what is still buffered
    pub fn with_drain_on_stop(mut self, drain_on_stop: bool) -> Self {
        self.drain_on_stop = drain_on_stop;
        self
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the worker thread. Returns false if it was already running.
    pub fn start(&mut self) -> std::io::Result<bool> {
        if self.worker.is_some() {
            return Ok(false);
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let buffer = self.buffer.clone();
        let sink = self.sink.clone();
        let tick = self.tick;

        let spawned = thread::Builder::new()
            .name("padmap-flush".to_string())
            .spawn(move || {
                log::debug!("flush scheduler started (tick {:?}, window {:?})", tick, buffer.flush_interval());
                while running.load(Ordering::SeqCst) {
                    thread::sleep(tick);
                    let now = buffer.clock().now();
                    flush_and_apply(&buffer, &sink, now);
                }
                log::debug!("flush scheduler stopped");
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(true)
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Run one flush on the calling thread at the clock's current time
    pub fn tick(&self) -> FlushReport {
        let now = self.buffer.clock().now();
        flush_and_apply(&self.buffer, &self.sink, now)
    }

    /// Stop the worker and settle what is still buffered.
    ///
    /// With drain-on-stop (the default) the remaining events are applied one
    /// window at a time, each window submitted separately. Otherwise they are
    /// discarded and the count is logged.
    pub fn stop(&mut self) -> FlushReport {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("flush thread panicked");
            }
        }

        let mut report = FlushReport::default();
        if self.drain_on_stop {
            let batches = self.buffer.drain();
            if !batches.is_empty() {
                log::debug!("draining {} buffered window(s) on stop", batches.len());
            }
            let mut sink = self.sink.lock();
            for batch in batches {
                report.merge(apply_batch(&mut **sink, batch.as_slice()));
            }
        } else {
            let discarded = self.buffer.discard();
            if discarded > 0 {
                log::warn!("discarded {} buffered event(s) on stop", discarded);
            }
        }
        report
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}
