use crate::presence::PresencePatch;

use super::{CursorMachine, CursorState};

impl CursorMachine {
    /// Processes a pointer press.
    ///
    /// In `Reaction` mode this marks the reaction as pressed so the emitter
    /// starts sampling it. Other modes are unaffected.
    pub fn on_pointer_down(&mut self) {
        if let CursorState::Reaction { is_pressed, .. } = &mut self.state {
            *is_pressed = true;
        }
    }

    /// Processes a pointer release.
    ///
    /// Release also sets `is_pressed = true`, so a pressed reaction keeps
    /// emitting until the mode changes.
    pub fn on_pointer_up(&mut self) {
        if let CursorState::Reaction { is_pressed, .. } = &mut self.state {
            *is_pressed = true;
        }
    }

    /// Processes the pointer leaving the surface: hide and clear presence,
    /// whatever the previous mode was.
    pub fn on_pointer_leave(&mut self) {
        self.queue_presence(PresencePatch::clear());
        self.set_state(CursorState::Hidden);
    }
}
