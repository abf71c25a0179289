// Padmap End-to-End Session Scenarios
//
// These tests drive complete key sequences through a configured session
// and check what reaches the output sink, without requiring uinput.
//
// Run with: cargo test -p padmap-core --test session_test

mod e2e_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use padmap_core::{
        Action, Axis, Button, Config, KeyCode, KeyOutcome, ManualClock, MemorySink, Session, SinkCall,
        Slider,
    };

    const CONFIG: &str = r#"
[startup]
enabled = true
pad_count = 2

[coalesce]
flush_interval_ms = 10
tick_ms = 1

[[profile]]
name = "racing"
[profile.commands]
F12 = "enableToggle"
F11 = "disable"
F10 = "enable"
F2 = "config1"
ESC = "exit"
[profile.pads.1]
W = "RT"
S = "LT"
A = "LLEFT"
D = "LRIGHT"
SPACE = "A"
[profile.pads.2]
UP = "Y"
SPACE = "B"

[[profile]]
name = "menu"
[profile.commands]
F1 = "config0"
[profile.pads.1]
ENTER = "START"
"#;

    // =========================================================================
    // Test Helpers
    // =========================================================================

    fn key(name: &str) -> KeyCode {
        KeyCode::from_name(name).unwrap()
    }

    fn immediate_session() -> (Session, MemorySink) {
        let toml = CONFIG.replace("flush_interval_ms = 10", "flush_interval_ms = 0");
        let config = Config::from_toml(&toml).unwrap();
        let memory = MemorySink::new();
        let session = Session::from_config(&config, Box::new(memory.clone()), Arc::new(ManualClock::new()));
        (session, memory)
    }

    fn buffered_session() -> (Session, MemorySink, Arc<ManualClock>) {
        let config = Config::from_toml(CONFIG).unwrap();
        let memory = MemorySink::new();
        let clock = Arc::new(ManualClock::new());
        let session = Session::from_config(&config, Box::new(memory.clone()), clock.clone());
        (session, memory, clock)
    }

    /// Simulate a key tap
    fn tap(session: &Session, name: &str) -> Vec<KeyOutcome> {
        vec![
            session.handle_key(key(name), Action::Press),
            session.handle_key(key(name), Action::Release),
        ]
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    #[test]
    fn test_steering_and_throttle() {
        let (session, memory) = immediate_session();
        assert!(session.dispatcher().is_immediate());

        session.handle_key(key("W"), Action::Press);
        session.handle_key(key("A"), Action::Press);
        session.handle_key(key("A"), Action::Release);
        session.handle_key(key("D"), Action::Press);
        session.handle_key(key("W"), Action::Release);

        assert_eq!(
            memory.applied(),
            vec![
                SinkCall::Slider(0, Slider::RightTrigger, 0xFF),
                SinkCall::Axis(0, Axis::LeftThumbX, -0x7530),
                SinkCall::Axis(0, Axis::LeftThumbX, 0),
                SinkCall::Axis(0, Axis::LeftThumbX, 0x7530),
                SinkCall::Slider(0, Slider::RightTrigger, 0),
            ]
        );
        // Immediate mode submits after every change
        assert_eq!(memory.submits().len(), 5);
    }

    #[test]
    fn test_first_pad_with_binding_wins() {
        let (session, memory) = immediate_session();
        assert_eq!(session.pad_count(), 2);

        tap(&session, "SPACE");
        tap(&session, "UP");
        assert_eq!(
            memory.applied(),
            vec![
                SinkCall::Button(0, Button::A, true),
                SinkCall::Button(0, Button::A, false),
                SinkCall::Button(1, Button::Y, true),
                SinkCall::Button(1, Button::Y, false),
            ]
        );
    }

    #[test]
    fn test_held_button_auto_repeat() {
        let (session, memory) = immediate_session();
        session.handle_key(key("SPACE"), Action::Press);
        for _ in 0..5 {
            assert_eq!(session.handle_key(key("SPACE"), Action::Repeat), KeyOutcome::Handled);
        }
        session.handle_key(key("SPACE"), Action::Release);
        assert_eq!(memory.applied().len(), 2);
    }

    #[test]
    fn test_quick_tap_is_split_across_windows() {
        let (session, memory, clock) = buffered_session();
        assert!(!session.dispatcher().is_immediate());

        tap(&session, "SPACE");
        assert!(memory.calls().is_empty());

        clock.set(10);
        session.dispatcher().tick();
        assert_eq!(memory.calls(), vec![SinkCall::Button(0, Button::A, true), SinkCall::Submit(0)]);

        clock.set(20);
        session.dispatcher().tick();
        assert_eq!(
            memory.applied(),
            vec![SinkCall::Button(0, Button::A, true), SinkCall::Button(0, Button::A, false)]
        );
        assert_eq!(memory.submits(), vec![0, 0]);
    }

    #[test]
    fn test_stop_flushes_pending_keys() {
        let (mut session, memory, _clock) = buffered_session();
        session.start().unwrap();

        tap(&session, "UP");
        let report = session.stop();

        assert_eq!(report.applied, 2);
        assert_eq!(
            memory.applied(),
            vec![SinkCall::Button(1, Button::Y, true), SinkCall::Button(1, Button::Y, false)]
        );
    }

    #[test]
    fn test_enable_disable_commands() {
        let (session, memory) = immediate_session();
        let last = Arc::new(AtomicBool::new(true));
        let seen = last.clone();
        session.add_listener(Arc::new(move |enabled: bool| seen.store(enabled, Ordering::SeqCst)));

        assert_eq!(tap(&session, "F11"), vec![KeyOutcome::Handled, KeyOutcome::Handled]);
        assert!(!session.is_enabled());
        assert!(!last.load(Ordering::SeqCst));

        assert_eq!(tap(&session, "SPACE"), vec![KeyOutcome::Unmapped, KeyOutcome::Unmapped]);
        assert!(memory.calls().is_empty());

        tap(&session, "F10");
        assert!(session.is_enabled());
        assert!(last.load(Ordering::SeqCst));

        tap(&session, "F12");
        assert!(!session.is_enabled());
        tap(&session, "F12");
        assert!(session.is_enabled());
    }

    #[test]
    fn test_profile_round_trip() {
        let (session, memory) = immediate_session();

        tap(&session, "F2");
        assert_eq!(session.active_profile(), 1);
        assert_eq!(tap(&session, "SPACE"), vec![KeyOutcome::Unmapped, KeyOutcome::Unmapped]);
        tap(&session, "ENTER");

        tap(&session, "F1");
        assert_eq!(session.active_profile(), 0);
        tap(&session, "SPACE");

        assert_eq!(
            memory.applied(),
            vec![
                SinkCall::Button(0, Button::Start, true),
                SinkCall::Button(0, Button::Start, false),
                SinkCall::Button(0, Button::A, true),
                SinkCall::Button(0, Button::A, false),
            ]
        );
    }

    #[test]
    fn test_exit_command() {
        let (session, _memory) = immediate_session();
        assert_eq!(tap(&session, "ESC"), vec![KeyOutcome::Exit, KeyOutcome::Handled]);

        session.disable();
        assert_eq!(session.handle_key(key("ESC"), Action::Press), KeyOutcome::Exit);
    }

    #[test]
    fn test_unavailable_pad_does_not_break_session() {
        let (session, memory) = immediate_session();
        memory.set_unavailable(1);

        assert_eq!(tap(&session, "UP"), vec![KeyOutcome::Handled, KeyOutcome::Handled]);
        tap(&session, "SPACE");
        assert_eq!(
            memory.applied(),
            vec![SinkCall::Button(0, Button::A, true), SinkCall::Button(0, Button::A, false)]
        );
    }
}
