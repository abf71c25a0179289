// Padmap Control Identity
// Addressable elements of a virtual pad and the values they carry

use std::fmt;

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Digital buttons of a virtual pad
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr, EnumString, EnumIter,
)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    X,
    Y,
    Start,
    Back,
    Guide,
    LeftShoulder,
    LeftThumb,
    RightShoulder,
    RightThumb,
}

/// Signed thumbstick axes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr, EnumString, EnumIter,
)]
pub enum Axis {
    LeftThumbX,
    LeftThumbY,
    RightThumbX,
    RightThumbY,
}

/// Unsigned analog triggers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr, EnumString, EnumIter,
)]
pub enum Slider {
    LeftTrigger,
    RightTrigger,
}

/// Kind of a control, selects the Output Sink setter used to apply it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ControlKind {
    Button,
    Axis,
    Slider,
}

/// A named control, independent of which pad it lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Control {
    Button(Button),
    Axis(Axis),
    Slider(Slider),
}

impl Control {
    pub fn kind(self) -> ControlKind {
        match self {
            Control::Button(_) => ControlKind::Button,
            Control::Axis(_) => ControlKind::Axis,
            Control::Slider(_) => ControlKind::Slider,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Control::Button(b) => b.into(),
            Control::Axis(a) => a.into(),
            Control::Slider(s) => s.into(),
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.name())
    }
}

/// Identifies one control on one output device.
///
/// Used as the equality/lookup key of the coalescing engine. The state value
/// is not part of the identity: two events address the same control iff
/// their identities are equal, whatever values they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlIdentity {
    pub device_index: usize,
    pub control: Control,
}

impl ControlIdentity {
    pub fn new(device_index: usize, control: Control) -> Self {
        Self {
            device_index,
            control,
        }
    }

    pub fn button(device_index: usize, button: Button) -> Self {
        Self::new(device_index, Control::Button(button))
    }

    pub fn axis(device_index: usize, axis: Axis) -> Self {
        Self::new(device_index, Control::Axis(axis))
    }

    pub fn slider(device_index: usize, slider: Slider) -> Self {
        Self::new(device_index, Control::Slider(slider))
    }

    pub fn kind(&self) -> ControlKind {
        self.control.kind()
    }
}

impl fmt::Display for ControlIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pad{}/{}", self.device_index + 1, self.control)
    }
}

/// State value applied to a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlValue {
    Button(bool),
    Axis(i16),
    Slider(u8),
}

impl ControlValue {
    pub fn kind(self) -> ControlKind {
        match self {
            ControlValue::Button(_) => ControlKind::Button,
            ControlValue::Axis(_) => ControlKind::Axis,
            ControlValue::Slider(_) => ControlKind::Slider,
        }
    }

    /// Check whether this value can be applied to `control`
    pub fn fits(self, control: Control) -> bool {
        self.kind() == control.kind()
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Button(pressed) => write!(f, "{}", if *pressed { "down" } else { "up" }),
            ControlValue::Axis(v) => write!(f, "{}", v),
            ControlValue::Slider(v) => write!(f, "{}", v),
        }
    }
}
