// Padmap Core Library
// Keyboard-to-gamepad mapping with coalesced output delivery

pub mod action;
pub mod coalesce;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod keycode;
pub mod mapping;
pub mod output;
pub mod session;

pub use action::Action;
pub use coalesce::{
    Clock, CoalescingBuffer, FlushBatch, ManualClock, MonotonicClock, PendingEvent, Timestamp,
    DEFAULT_MAX_PENDING,
};
pub use config::{default_config_content, Config, ConfigError};
pub use control::{Axis, Button, Control, ControlIdentity, ControlKind, ControlValue, Slider};
pub use dispatch::{flush_and_apply, DispatchConfig, Dispatcher, FlushScheduler, SharedSink, DEFAULT_TICK};
pub use keycode::KeyCode;
pub use mapping::{Command, Mapper, Profile, Resolved, Target, STICK_DEFLECTION, TRIGGER_PULL};
pub use output::{apply_batch, apply_event, FlushReport, LoggingSink, MemorySink, OutputSink, SinkCall, SinkError};
pub use session::{EnableListener, HeldButtons, KeyOutcome, Session};

#[cfg(feature = "uinput")]
pub use output::VirtualPadSink;
