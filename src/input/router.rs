//! Routes raw host input to the cursor state machine and the presence store.

use std::rc::Rc;

use log::{debug, warn};

use super::events::{Key, KeyDisposition, PointerEvent};
use super::state::{CursorMachine, CursorState};
use crate::presence::{Point, PresencePatch, PresenceStore};
use crate::util::Rect;

/// Maps pointer and keyboard events onto [`CursorMachine`] transitions and
/// presence writes.
///
/// All side effects are synchronous and local: the router never talks to the
/// event channel. Presence write failures are logged and the local state is
/// kept.
pub struct InputRouter {
    machine: CursorMachine,
    presence: Rc<dyn PresenceStore>,
    /// Bounding box of the interactive surface; `None` until mounted
    surface: Option<Rect>,
    freeze_in_selector: bool,
}

impl InputRouter {
    pub fn new(
        machine: CursorMachine,
        presence: Rc<dyn PresenceStore>,
        freeze_in_selector: bool,
    ) -> Self {
        Self {
            machine,
            presence,
            surface: None,
            freeze_in_selector,
        }
    }

    /// Records the surface bounding box; also used on resize.
    pub fn mount(&mut self, bounds: Rect) {
        self.surface = Some(bounds);
    }

    /// Forgets the surface; pointer events become no-ops until the next mount.
    pub fn unmount(&mut self) {
        self.surface = None;
    }

    pub fn surface(&self) -> Option<Rect> {
        self.surface
    }

    pub fn cursor_state(&self) -> &CursorState {
        self.machine.state()
    }

    pub fn machine(&self) -> &CursorMachine {
        &self.machine
    }

    /// Pointer motion: moves the published cursor unless the reaction picker
    /// holds it in place. Outside the surface, or before mount, nothing happens.
    pub fn on_pointer_move(&mut self, event: PointerEvent) {
        if !self.machine.allows_cursor_move(self.freeze_in_selector) {
            return;
        }
        if let Some(point) = self.locate(event) {
            self.publish(PresencePatch::cursor(point));
        }
    }

    /// Pointer press: publishes the cursor and presses a chosen reaction.
    /// Presses outside the surface, or before mount, are ignored.
    pub fn on_pointer_down(&mut self, event: PointerEvent) {
        let Some(point) = self.locate(event) else {
            debug!("Pointer down outside the surface; ignoring");
            return;
        };
        self.publish(PresencePatch::cursor(point));
        self.machine.on_pointer_down();
        self.flush_presence();
    }

    /// Pointer release: publishes the cursor; a chosen reaction stays pressed.
    /// Releases outside the surface, or before mount, are ignored.
    pub fn on_pointer_up(&mut self, event: PointerEvent) {
        let Some(point) = self.locate(event) else {
            debug!("Pointer up outside the surface; ignoring");
            return;
        };
        self.publish(PresencePatch::cursor(point));
        self.machine.on_pointer_up();
        self.flush_presence();
    }

    /// Pointer left the surface: back to `Hidden` with presence cleared.
    pub fn on_pointer_leave(&mut self) {
        self.machine.on_pointer_leave();
        self.flush_presence();
    }

    /// Key press; the caller must honour the returned disposition.
    pub fn on_key_down(&mut self, key: Key) -> KeyDisposition {
        let disposition = self.machine.on_key_down(key);
        self.flush_presence();
        disposition
    }

    pub fn on_key_up(&mut self, key: Key) {
        self.machine.on_key_up(key);
        self.flush_presence();
    }

    /// A reaction was chosen in the picker UI.
    pub fn select_reaction(&mut self, value: &str) {
        self.machine.select_reaction(value);
        self.flush_presence();
    }

    /// Converts client coordinates to canvas-local ones, or `None` if the
    /// surface is not mounted or the pointer is outside it.
    fn locate(&self, event: PointerEvent) -> Option<Point> {
        let surface = self.surface?;
        if !surface.contains(event.client_x, event.client_y) {
            return None;
        }
        Some(surface.to_local(event.client_x, event.client_y))
    }

    fn flush_presence(&mut self) {
        if let Some(patch) = self.machine.take_pending_presence() {
            self.publish(patch);
        }
    }

    fn publish(&self, patch: PresencePatch) {
        if let Err(err) = self.presence.publish(patch) {
            warn!("Presence update failed, keeping local state: {err}");
        }
    }
}
