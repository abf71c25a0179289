// Padmap Mapping
// Key-to-control profiles, binding targets and command bindings

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::action::Action;
use crate::control::{Axis, Button, Control, ControlIdentity, ControlValue, Slider};
use crate::keycode::KeyCode;

/// Stick deflection applied by a directional axis binding
pub const STICK_DEFLECTION: i16 = 0x7530;

/// Trigger value applied by a trigger binding
pub const TRIGGER_PULL: u8 = 0xFF;

/// What a key drives on a pad: a control plus its values for both edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub control: Control,
    pub active: ControlValue,
    pub inactive: ControlValue,
}

impl Target {
    pub fn button(button: Button) -> Self {
        Self {
            control: Control::Button(button),
            active: ControlValue::Button(true),
            inactive: ControlValue::Button(false),
        }
    }

    pub fn axis(axis: Axis, deflection: i16) -> Self {
        Self {
            control: Control::Axis(axis),
            active: ControlValue::Axis(deflection),
            inactive: ControlValue::Axis(0),
        }
    }

    pub fn slider(slider: Slider, pull: u8) -> Self {
        Self {
            control: Control::Slider(slider),
            active: ControlValue::Slider(pull),
            inactive: ControlValue::Slider(0),
        }
    }

    /// Parse a binding target name such as `A`, `LB`, `LLEFT` or `RT`
    pub fn from_name(name: &str) -> Option<Self> {
        let target = match name.trim().to_ascii_uppercase().as_str() {
            "UP" => Self::button(Button::Up),
            "DOWN" => Self::button(Button::Down),
            "LEFT" => Self::button(Button::Left),
            "RIGHT" => Self::button(Button::Right),
            "A" => Self::button(Button::A),
            "B" => Self::button(Button::B),
            "X" => Self::button(Button::X),
            "Y" => Self::button(Button::Y),
            "START" => Self::button(Button::Start),
            "BACK" => Self::button(Button::Back),
            "GUIDE" => Self::button(Button::Guide),
            "LB" => Self::button(Button::LeftShoulder),
            "LTB" => Self::button(Button::LeftThumb),
            "RB" => Self::button(Button::RightShoulder),
            "RTB" => Self::button(Button::RightThumb),
            "LLEFT" => Self::axis(Axis::LeftThumbX, -STICK_DEFLECTION),
            "LRIGHT" => Self::axis(Axis::LeftThumbX, STICK_DEFLECTION),
            "LUP" => Self::axis(Axis::LeftThumbY, STICK_DEFLECTION),
            "LDOWN" => Self::axis(Axis::LeftThumbY, -STICK_DEFLECTION),
            "RLEFT" => Self::axis(Axis::RightThumbX, -STICK_DEFLECTION),
            "RRIGHT" => Self::axis(Axis::RightThumbX, STICK_DEFLECTION),
            "RUP" => Self::axis(Axis::RightThumbY, STICK_DEFLECTION),
            "RDOWN" => Self::axis(Axis::RightThumbY, -STICK_DEFLECTION),
            "LT" => Self::slider(Slider::LeftTrigger, TRIGGER_PULL),
            "RT" => Self::slider(Slider::RightTrigger, TRIGGER_PULL),
            _ => return None,
        };
        Some(target)
    }
}

/// Session-level commands bound to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    EnableToggle,
    Enable,
    Disable,
    Exit,
    /// Switch to the profile with this index
    SwitchProfile(usize),
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "enableToggle" => Ok(Command::EnableToggle),
            "enable" => Ok(Command::Enable),
            "disable" => Ok(Command::Disable),
            "exit" => Ok(Command::Exit),
            other => other
                .strip_prefix("config")
                .filter(|digits| !digits.is_empty())
                .and_then(|digits| digits.parse::<usize>().ok())
                .map(Command::SwitchProfile)
                .ok_or_else(|| format!("Unknown command: {}", other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::EnableToggle => write!(f, "enableToggle"),
            Command::Enable => write!(f, "enable"),
            Command::Disable => write!(f, "disable"),
            Command::Exit => write!(f, "exit"),
            Command::SwitchProfile(index) => write!(f, "config{}", index),
        }
    }
}

/// A mapping profile: per-pad key bindings plus command keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    name: String,
    pads: Vec<HashMap<KeyCode, Target>>,
    commands: HashMap<KeyCode, Command>,
}

impl Profile {
    pub fn new(name: impl Into<String>, pad_count: usize) -> Self {
        Self {
            name: name.into(),
            pads: vec![HashMap::new(); pad_count],
            commands: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pad_count(&self) -> usize {
        self.pads.len()
    }

    /// Bind `key` on pad `pad` (0-based), growing the pad list if needed
    pub fn bind(&mut self, pad: usize, key: KeyCode, target: Target) {
        if pad >= self.pads.len() {
            self.pads.resize_with(pad + 1, HashMap::new);
        }
        self.pads[pad].insert(key, target);
    }

    pub fn bind_command(&mut self, key: KeyCode, command: Command) {
        self.commands.insert(key, command);
    }

    pub fn target(&self, pad: usize, key: KeyCode) -> Option<&Target> {
        self.pads.get(pad).and_then(|bindings| bindings.get(&key))
    }

    pub fn command(&self, key: KeyCode) -> Option<Command> {
        self.commands.get(&key).copied()
    }

    pub fn bindings(&self, pad: usize) -> Option<&HashMap<KeyCode, Target>> {
        self.pads.get(pad)
    }

    pub fn commands(&self) -> &HashMap<KeyCode, Command> {
        &self.commands
    }
}

/// A key resolved against a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub identity: ControlIdentity,
    pub active: ControlValue,
    pub inactive: ControlValue,
}

impl Resolved {
    /// Value to apply for the given key edge
    pub fn value_for(&self, action: Action) -> ControlValue {
        if action.is_active() {
            self.active
        } else {
            self.inactive
        }
    }
}

/// Table lookup from raw key codes to pad controls
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    profiles: Vec<Profile>,
}

impl Mapper {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn profile(&self, index: usize) -> Option<&Profile> {
        self.profiles.get(index)
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    /// Resolve `code` on one pad of one profile.
    ///
    /// `None` means the key is not bound there; callers offer it to other
    /// handlers instead of treating it as an error.
    pub fn resolve(&self, code: KeyCode, device_index: usize, profile: usize) -> Option<Resolved> {
        let target = self.profiles.get(profile)?.target(device_index, code)?;
        Some(Resolved {
            identity: ControlIdentity::new(device_index, target.control),
            active: target.active,
            inactive: target.inactive,
        })
    }

    /// Command bound to `code` in a profile
    pub fn command(&self, code: KeyCode, profile: usize) -> Option<Command> {
        self.profiles.get(profile)?.command(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mapper() -> Mapper {
        let mut first = Profile::new("default", 2);
        first.bind(0, KeyCode(17), Target::from_name("UP").unwrap()); // W
        first.bind(0, KeyCode(30), Target::from_name("LLEFT").unwrap()); // A
        first.bind(1, KeyCode(103), Target::from_name("LT").unwrap()); // UP arrow
        first.bind_command(KeyCode(88), Command::EnableToggle); // F12

        let mut second = Profile::new("alt", 2);
        second.bind(0, KeyCode(17), Target::from_name("Y").unwrap());
        Mapper::new(vec![first, second])
    }

    #[test]
    fn test_target_names() {
        assert_eq!(Target::from_name("lb"), Some(Target::button(Button::LeftShoulder)));
        assert_eq!(
            Target::from_name("RDOWN"),
            Some(Target::axis(Axis::RightThumbY, -STICK_DEFLECTION))
        );
        assert_eq!(Target::from_name("RT").unwrap().active, ControlValue::Slider(0xFF));
        assert!(Target::from_name("TURBO").is_none());
    }

    #[test]
    fn test_opposite_directions_share_identity() {
        let left = Target::from_name("LLEFT").unwrap();
        let right = Target::from_name("LRIGHT").unwrap();
        assert_eq!(left.control, right.control);
        assert_ne!(left.active, right.active);
    }

    #[test]
    fn test_resolve() {
        let mapper = sample_mapper();
        let resolved = mapper.resolve(KeyCode(30), 0, 0).unwrap();
        assert_eq!(resolved.identity, ControlIdentity::axis(0, Axis::LeftThumbX));
        assert_eq!(resolved.value_for(Action::Press), ControlValue::Axis(-STICK_DEFLECTION));
        assert_eq!(resolved.value_for(Action::Release), ControlValue::Axis(0));

        let trigger = mapper.resolve(KeyCode(103), 1, 0).unwrap();
        assert_eq!(trigger.identity, ControlIdentity::slider(1, Slider::LeftTrigger));
    }

    #[test]
    fn test_resolve_unmapped() {
        let mapper = sample_mapper();
        assert!(mapper.resolve(KeyCode(30), 1, 0).is_none());
        assert!(mapper.resolve(KeyCode(30), 5, 0).is_none());
        assert!(mapper.resolve(KeyCode(30), 0, 9).is_none());
    }

    #[test]
    fn test_resolve_follows_profile() {
        let mapper = sample_mapper();
        assert_eq!(
            mapper.resolve(KeyCode(17), 0, 1).unwrap().identity,
            ControlIdentity::button(0, Button::Y)
        );
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!("enableToggle".parse::<Command>(), Ok(Command::EnableToggle));
        assert_eq!("exit".parse::<Command>(), Ok(Command::Exit));
        assert_eq!("config2".parse::<Command>(), Ok(Command::SwitchProfile(2)));
        assert!("config".parse::<Command>().is_err());
        assert!("EnableToggle".parse::<Command>().is_err());
        assert_eq!(Command::SwitchProfile(3).to_string(), "config3");
    }

    #[test]
    fn test_commands() {
        let mapper = sample_mapper();
        assert_eq!(mapper.command(KeyCode(88), 0), Some(Command::EnableToggle));
        assert_eq!(mapper.command(KeyCode(88), 1), None);
    }
}
