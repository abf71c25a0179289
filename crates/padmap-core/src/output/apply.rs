// Padmap Batch Application
// Applies released events to a sink and submits each changed device once

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::sink::{OutputSink, SinkError};
use crate::coalesce::PendingEvent;
use crate::control::{Control, ControlValue};

/// Outcome of applying one batch
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Events successfully handed to a setter
    pub applied: usize,
    /// Devices submitted, in first-touched order
    pub submitted: Vec<usize>,
    /// Errors, tagged with the device they came from
    pub failures: SmallVec<[(usize, SinkError); 2]>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Devices with at least one failure, in first-failure order
    pub fn failed_devices(&self) -> Vec<usize> {
        let devices: IndexSet<usize> = self.failures.iter().map(|(d, _)| *d).collect();
        devices.into_iter().collect()
    }

    /// Fold a later report into this one
    pub fn merge(&mut self, other: FlushReport) {
        self.applied += other.applied;
        self.submitted.extend(other.submitted);
        self.failures.extend(other.failures);
    }
}

/// Apply a single event with the setter matching its control kind
pub fn apply_event<S: OutputSink + ?Sized>(sink: &mut S, event: &PendingEvent) -> Result<(), SinkError> {
    let device = event.identity.device_index;
    match (event.identity.control, event.value) {
        (Control::Button(button), ControlValue::Button(pressed)) => {
            sink.set_button_state(device, button, pressed)
        }
        (Control::Axis(axis), ControlValue::Axis(value)) => sink.set_axis_value(device, axis, value),
        (Control::Slider(slider), ControlValue::Slider(value)) => {
            sink.set_slider_value(device, slider, value)
        }
        (control, value) => Err(SinkError::ValueMismatch {
            control: control.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Apply `events` in order, then submit every device that changed.
///
/// A device whose setter or submit fails is skipped for the rest of the pass;
/// other devices are unaffected. A value that does not fit its control only
/// skips that event.
pub fn apply_batch<S: OutputSink + ?Sized>(sink: &mut S, events: &[PendingEvent]) -> FlushReport {
    let mut report = FlushReport::default();
    let mut changed: IndexSet<usize> = IndexSet::new();
    let mut failed: SmallVec<[usize; 4]> = SmallVec::new();

    for event in events {
        let device = event.identity.device_index;
        if failed.contains(&device) {
            log::debug!("pad{} failed earlier this pass, skipping {}", device + 1, event.identity);
            continue;
        }

        match apply_event(sink, event) {
            Ok(()) => {
                report.applied += 1;
                changed.insert(device);
            }
            Err(err @ SinkError::ValueMismatch { .. }) => {
                log::error!("skipping {}: {}", event.identity, err);
                report.failures.push((device, err));
            }
            Err(err) => {
                log::error!("pad{} setter failed: {}", device + 1, err);
                failed.push(device);
                report.failures.push((device, err));
            }
        }
    }

    for device in changed {
        if failed.contains(&device) {
            continue;
        }
        match sink.submit(device) {
            Ok(()) => report.submitted.push(device),
            Err(err) => {
                log::error!("pad{} submit failed: {}", device + 1, err);
                report.failures.push((device, err));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coalesce::Timestamp;
    use crate::control::{Axis, Button, ControlIdentity, Slider};
    use crate::output::sink::{MemorySink, SinkCall};

    fn event(identity: ControlIdentity, value: ControlValue) -> PendingEvent {
        PendingEvent::new(identity, value, Timestamp::ZERO)
    }

    #[test]
    fn test_submit_once_per_device() {
        let mut sink = MemorySink::new();
        let events = vec![
            event(ControlIdentity::button(0, Button::A), ControlValue::Button(true)),
            event(ControlIdentity::axis(1, Axis::RightThumbX), ControlValue::Axis(30000)),
            event(ControlIdentity::slider(0, Slider::LeftTrigger), ControlValue::Slider(255)),
        ];

        let report = apply_batch(&mut sink, &events);
        assert!(report.is_clean());
        assert_eq!(report.applied, 3);
        assert_eq!(report.submitted, vec![0, 1]);
        assert_eq!(sink.submits(), vec![0, 1]);
        assert_eq!(
            sink.applied(),
            vec![
                SinkCall::Button(0, Button::A, true),
                SinkCall::Axis(1, Axis::RightThumbX, 30000),
                SinkCall::Slider(0, Slider::LeftTrigger, 255),
            ]
        );
    }

    #[test]
    fn test_unavailable_device_does_not_stop_others() {
        let mut sink = MemorySink::new();
        sink.set_unavailable(0);
        let events = vec![
            event(ControlIdentity::button(0, Button::A), ControlValue::Button(true)),
            event(ControlIdentity::button(1, Button::A), ControlValue::Button(true)),
            event(ControlIdentity::button(0, Button::B), ControlValue::Button(true)),
        ];

        let report = apply_batch(&mut sink, &events);
        assert_eq!(report.applied, 1);
        assert_eq!(report.submitted, vec![1]);
        assert_eq!(report.failed_devices(), vec![0]);
        // Second pad0 event is skipped, not retried
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn test_mismatched_value_skips_event_only() {
        let mut sink = MemorySink::new();
        let events = vec![
            event(ControlIdentity::button(0, Button::A), ControlValue::Axis(3)),
            event(ControlIdentity::button(0, Button::B), ControlValue::Button(true)),
        ];

        let report = apply_batch(&mut sink, &events);
        assert_eq!(report.applied, 1);
        assert_eq!(report.submitted, vec![0]);
        assert!(matches!(report.failures[0].1, SinkError::ValueMismatch { .. }));
    }

    #[test]
    fn test_failed_devices_listed_once() {
        let mut sink = MemorySink::new();
        sink.set_unavailable(1);
        let events = vec![
            event(ControlIdentity::button(0, Button::A), ControlValue::Axis(3)),
            event(ControlIdentity::button(1, Button::A), ControlValue::Button(true)),
            event(ControlIdentity::axis(0, Axis::LeftThumbX), ControlValue::Button(true)),
        ];

        let report = apply_batch(&mut sink, &events);
        assert_eq!(report.failures.len(), 3);
        assert_eq!(report.failed_devices(), vec![0, 1]);
    }

    #[test]
    fn test_empty_batch_submits_nothing() {
        let mut sink = MemorySink::new();
        let report = apply_batch(&mut sink, &[]);
        assert_eq!(report.applied, 0);
        assert!(sink.calls().is_empty());
    }
}
