// Padmap Key Action
// Edge of a raw keyboard event (press, release, auto-repeat)

use std::fmt;
use std::str::FromStr;

/// Edge reported by the keyboard for one physical key event.
///
/// The numeric values follow the evdev convention:
///   0 == 'released'
///   1 == 'pressed'
///   2 == 'repeated'
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Action {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl Action {
    /// True for the "active" edge of a mapped control (press or auto-repeat)
    pub fn is_active(self) -> bool {
        matches!(self, Action::Press | Action::Repeat)
    }

    /// True only for the first press, not for auto-repeat
    pub fn just_pressed(self) -> bool {
        matches!(self, Action::Press)
    }

    pub fn is_released(self) -> bool {
        matches!(self, Action::Release)
    }

    /// Create Action from an evdev-style value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Action::Release),
            1 => Some(Action::Press),
            2 => Some(Action::Repeat),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Release => write!(f, "release"),
            Action::Press => write!(f, "press"),
            Action::Repeat => write!(f, "repeat"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "press" | "down" => Ok(Action::Press),
            "release" | "up" => Ok(Action::Release),
            "repeat" => Ok(Action::Repeat),
            other => Err(format!("Unknown key action: {}", other)),
        }
    }
}
