// Padmap Session
// Top-level key handler: commands, enable state, repeat suppression, dispatch

mod pressed;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::action::Action;
use crate::coalesce::Clock;
use crate::config::Config;
use crate::control::{Control, ControlIdentity, ControlValue};
use crate::dispatch::Dispatcher;
use crate::keycode::KeyCode;
use crate::mapping::{Command, Mapper, Resolved};
use crate::output::{FlushReport, OutputSink};

pub use pressed::HeldButtons;

/// Result of handling one key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Consumed by a pad binding or a command
    Handled,
    /// No binding or command for this key; the caller may pass it through
    Unmapped,
    /// An exit command was triggered
    Exit,
}

/// Notified whenever mapping is enabled or disabled
pub trait EnableListener: Send + Sync {
    fn enabled_changed(&self, enabled: bool);
}

impl<F> EnableListener for F
where
    F: Fn(bool) + Send + Sync,
{
    fn enabled_changed(&self, enabled: bool) {
        self(enabled)
    }
}

/// Ties the mapper, command table and dispatcher together
pub struct Session {
    mapper: Mapper,
    dispatcher: Dispatcher,
    pad_count: usize,
    enabled: AtomicBool,
    active_profile: AtomicUsize,
    held: Mutex<HeldButtons>,
    listeners: Mutex<Vec<Arc<dyn EnableListener>>>,
}

impl Session {
    pub fn new(mapper: Mapper, dispatcher: Dispatcher, start_enabled: bool) -> Self {
        let pad_count = mapper
            .profiles()
            .iter()
            .map(|p| p.pad_count())
            .max()
            .unwrap_or(0);

        Self {
            mapper,
            dispatcher,
            pad_count,
            enabled: AtomicBool::new(start_enabled),
            active_profile: AtomicUsize::new(0),
            held: Mutex::new(HeldButtons::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Build a session (and its dispatcher) from a loaded config
    pub fn from_config(config: &Config, sink: Box<dyn OutputSink>, clock: Arc<dyn Clock>) -> Self {
        let dispatcher = Dispatcher::new(&config.dispatch, sink, clock);
        Self::new(config.mapper(), dispatcher, config.start_enabled)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn pad_count(&self) -> usize {
        self.pad_count
    }

    /// Start the flush scheduler when running coalesced
    pub fn start(&mut self) -> std::io::Result<bool> {
        self.dispatcher.start_scheduler()
    }

    /// Stop the flush scheduler, settling whatever is still buffered
    pub fn stop(&mut self) -> FlushReport {
        self.dispatcher.stop_scheduler()
    }

    pub fn add_listener(&self, listener: Arc<dyn EnableListener>) {
        self.listeners.lock().push(listener);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn enable(&self) {
        self.set_enabled(true);
    }

    pub fn disable(&self) {
        self.set_enabled(false);
    }

    /// Flip the enabled state, returning the new one
    pub fn toggle(&self) -> bool {
        let enabled = !self.enabled.fetch_xor(true, Ordering::SeqCst);
        self.on_enabled_changed(enabled);
        enabled
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        self.on_enabled_changed(enabled);
    }

    fn on_enabled_changed(&self, enabled: bool) {
        log::info!("mapping {}", if enabled { "enabled" } else { "disabled" });
        if !enabled {
            self.release_held();
        }

        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.enabled_changed(enabled);
        }
    }

    // Release edges are ignored while disabled, so held buttons are let go here
    fn release_held(&self) {
        let held = self.held.lock().take_all();
        for identity in held {
            self.send(identity, ControlValue::Button(false));
        }
    }

    pub fn active_profile(&self) -> usize {
        self.active_profile.load(Ordering::SeqCst)
    }

    /// Switch to profile `index`; out-of-range indices are ignored
    pub fn switch_profile(&self, index: usize) -> bool {
        match self.mapper.profile(index) {
            Some(profile) => {
                self.active_profile.store(index, Ordering::SeqCst);
                log::info!("switched to profile {} ({})", index, profile.name());
                true
            }
            None => {
                log::warn!(
                    "profile {} does not exist ({} configured), ignoring",
                    index,
                    self.mapper.profile_count()
                );
                false
            }
        }
    }

    /// Handle one key transition.
    ///
    /// Pad bindings are tried first, pad by pad, while enabled. Commands are
    /// honored even while disabled.
    pub fn handle_key(&self, code: KeyCode, action: Action) -> KeyOutcome {
        let profile = self.active_profile();

        if self.is_enabled() {
            let resolved = (0..self.pad_count).find_map(|pad| self.mapper.resolve(code, pad, profile));
            if let Some(resolved) = resolved {
                self.apply_binding(&resolved, action);
                return KeyOutcome::Handled;
            }
        }

        if let Some(command) = self.mapper.command(code, profile) {
            return self.run_command(command, action);
        }

        if self.is_enabled() {
            log::warn!("unmapped key {} ({})", code, action);
        }
        KeyOutcome::Unmapped
    }

    fn apply_binding(&self, resolved: &Resolved, action: Action) {
        let identity = resolved.identity;
        if let Control::Button(button) = identity.control {
            let mut held = self.held.lock();
            if action.is_active() {
                if !held.press(identity.device_index, button) {
                    log::trace!("suppressed repeat of {}", identity);
                    return;
                }
            } else {
                held.release(identity.device_index, button);
            }
        }

        self.send(identity, resolved.value_for(action));
    }

    fn run_command(&self, command: Command, action: Action) -> KeyOutcome {
        if command == Command::Exit {
            if action.just_pressed() {
                log::info!("exit requested");
                return KeyOutcome::Exit;
            }
            return KeyOutcome::Handled;
        }

        if !action.just_pressed() {
            return KeyOutcome::Handled;
        }

        log::debug!("command {}", command);
        match command {
            Command::EnableToggle => {
                self.toggle();
            }
            Command::Enable => self.enable(),
            Command::Disable => self.disable(),
            Command::SwitchProfile(index) => {
                self.switch_profile(index);
            }
            Command::Exit => {}
        }
        KeyOutcome::Handled
    }

    fn send(&self, identity: ControlIdentity, value: ControlValue) {
        if let Err(e) = self.dispatcher.send(identity, value) {
            log::error!("failed to apply {} = {}: {}", identity, value, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coalesce::ManualClock;
    use crate::control::{Axis, Button};
    use crate::dispatch::DispatchConfig;
    use crate::mapping::{Profile, Target};
    use crate::output::{MemorySink, SinkCall};

    const KEY_W: KeyCode = KeyCode(17);
    const KEY_A: KeyCode = KeyCode(30);
    const KEY_F1: KeyCode = KeyCode(59);
    const KEY_F2: KeyCode = KeyCode(60);
    const KEY_F12: KeyCode = KeyCode(88);
    const KEY_ESC: KeyCode = KeyCode(1);
    const KEY_Q: KeyCode = KeyCode(16);

    fn session(memory: &MemorySink) -> Session {
        let mut first = Profile::new("default", 2);
        first.bind(0, KEY_W, Target::from_name("A").unwrap());
        first.bind(1, KEY_A, Target::from_name("LLEFT").unwrap());
        first.bind_command(KEY_F12, Command::EnableToggle);
        first.bind_command(KEY_F2, Command::SwitchProfile(1));
        first.bind_command(KEY_ESC, Command::Exit);

        let mut second = Profile::new("second", 2);
        second.bind(0, KEY_W, Target::from_name("B").unwrap());
        second.bind_command(KEY_F1, Command::SwitchProfile(0));

        let dispatcher = Dispatcher::new(
            &DispatchConfig::immediate(),
            Box::new(memory.clone()),
            Arc::new(ManualClock::new()),
        );
        Session::new(Mapper::new(vec![first, second]), dispatcher, true)
    }

    #[test]
    fn test_button_press_and_release() {
        let memory = MemorySink::new();
        let session = session(&memory);

        assert_eq!(session.handle_key(KEY_W, Action::Press), KeyOutcome::Handled);
        assert_eq!(session.handle_key(KEY_W, Action::Release), KeyOutcome::Handled);
        assert_eq!(
            memory.applied(),
            vec![SinkCall::Button(0, Button::A, true), SinkCall::Button(0, Button::A, false)]
        );
    }

    #[test]
    fn test_button_repeat_is_suppressed() {
        let memory = MemorySink::new();
        let session = session(&memory);

        session.handle_key(KEY_W, Action::Press);
        assert_eq!(session.handle_key(KEY_W, Action::Repeat), KeyOutcome::Handled);
        assert_eq!(session.handle_key(KEY_W, Action::Press), KeyOutcome::Handled);
        assert_eq!(memory.applied(), vec![SinkCall::Button(0, Button::A, true)]);
    }

    #[test]
    fn test_axis_binding_on_second_pad() {
        let memory = MemorySink::new();
        let session = session(&memory);

        session.handle_key(KEY_A, Action::Press);
        session.handle_key(KEY_A, Action::Repeat);
        session.handle_key(KEY_A, Action::Release);
        assert_eq!(
            memory.applied(),
            vec![
                SinkCall::Axis(1, Axis::LeftThumbX, -0x7530),
                SinkCall::Axis(1, Axis::LeftThumbX, -0x7530),
                SinkCall::Axis(1, Axis::LeftThumbX, 0),
            ]
        );
    }

    #[test]
    fn test_unmapped_key() {
        let memory = MemorySink::new();
        let session = session(&memory);
        assert_eq!(session.handle_key(KEY_Q, Action::Press), KeyOutcome::Unmapped);
        assert!(memory.calls().is_empty());
    }

    #[test]
    fn test_toggle_command_works_while_disabled() {
        let memory = MemorySink::new();
        let session = session(&memory);

        assert_eq!(session.handle_key(KEY_F12, Action::Press), KeyOutcome::Handled);
        assert!(!session.is_enabled());
        assert_eq!(session.handle_key(KEY_F12, Action::Release), KeyOutcome::Handled);
        assert!(!session.is_enabled());

        assert_eq!(session.handle_key(KEY_W, Action::Press), KeyOutcome::Unmapped);
        assert!(memory.calls().is_empty());

        session.handle_key(KEY_F12, Action::Press);
        assert!(session.is_enabled());
    }

    #[test]
    fn test_disable_releases_held_buttons() {
        let memory = MemorySink::new();
        let session = session(&memory);

        session.handle_key(KEY_W, Action::Press);
        session.disable();
        assert_eq!(
            memory.applied(),
            vec![SinkCall::Button(0, Button::A, true), SinkCall::Button(0, Button::A, false)]
        );

        session.enable();
        session.handle_key(KEY_W, Action::Press);
        assert_eq!(memory.applied().len(), 3);
    }

    #[test]
    fn test_profile_switch() {
        let memory = MemorySink::new();
        let session = session(&memory);

        session.handle_key(KEY_F2, Action::Press);
        assert_eq!(session.active_profile(), 1);
        session.handle_key(KEY_W, Action::Press);
        assert_eq!(memory.applied(), vec![SinkCall::Button(0, Button::B, true)]);

        // F2 is not bound in the second profile
        assert_eq!(session.handle_key(KEY_F2, Action::Press), KeyOutcome::Unmapped);

        session.handle_key(KEY_F1, Action::Press);
        assert_eq!(session.active_profile(), 0);
        assert!(!session.switch_profile(7));
        assert_eq!(session.active_profile(), 0);
    }

    #[test]
    fn test_exit_on_press_only() {
        let memory = MemorySink::new();
        let session = session(&memory);
        assert_eq!(session.handle_key(KEY_ESC, Action::Release), KeyOutcome::Handled);
        assert_eq!(session.handle_key(KEY_ESC, Action::Press), KeyOutcome::Exit);
    }

    #[test]
    fn test_listeners_are_notified() {
        let memory = MemorySink::new();
        let session = session(&memory);
        let changes = Arc::new(AtomicUsize::new(0));
        let seen = changes.clone();
        session.add_listener(Arc::new(move |_enabled: bool| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(!session.toggle());
        assert!(session.toggle());
        session.disable();
        assert_eq!(changes.load(Ordering::SeqCst), 3);
    }
}
