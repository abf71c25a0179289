// Padmap Held Button State
// HashSet-based tracking of buttons currently held on each pad

use std::collections::HashSet;

use crate::control::{Button, ControlIdentity};

/// Buttons currently held, keyed by pad and button
#[derive(Debug, Clone, Default)]
pub struct HeldButtons {
    held: HashSet<(usize, Button)>,
}

impl HeldButtons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a button held. Returns `false` if it already was (auto-repeat).
    pub fn press(&mut self, device_index: usize, button: Button) -> bool {
        self.held.insert((device_index, button))
    }

    /// Returns `true` if the button was held
    pub fn release(&mut self, device_index: usize, button: Button) -> bool {
        self.held.remove(&(device_index, button))
    }

    pub fn is_held(&self, device_index: usize, button: Button) -> bool {
        self.held.contains(&(device_index, button))
    }

    /// Take every held button, leaving the set empty
    pub fn take_all(&mut self) -> Vec<ControlIdentity> {
        let mut all: Vec<_> = self
            .held
            .drain()
            .map(|(device_index, button)| ControlIdentity::button(device_index, button))
            .collect();
        all.sort();
        all
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}
