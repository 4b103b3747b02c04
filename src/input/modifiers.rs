//! Keyboard modifier state tracking.

use super::events::Key;

/// Keyboard modifier state.
///
/// Tracks which modifier keys are currently held so keybindings such as
/// `Ctrl+K` can be distinguished from a plain `k`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift key pressed
    pub shift: bool,
    /// Ctrl key pressed
    pub ctrl: bool,
    /// Alt key pressed
    pub alt: bool,
}

impl Modifiers {
    /// Creates a new Modifiers instance with all keys released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a modifier press or release; returns true if `key` was a modifier.
    pub fn track(&mut self, key: Key, pressed: bool) -> bool {
        match key {
            Key::Shift => self.shift = pressed,
            Key::Ctrl => self.ctrl = pressed,
            Key::Alt => self.alt = pressed,
            _ => return false,
        }
        true
    }

    /// Whether a command modifier is held (text entry ignores such keys).
    pub fn command_held(&self) -> bool {
        self.ctrl || self.alt
    }
}
