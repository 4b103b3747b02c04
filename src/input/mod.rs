//! Input handling and cursor mode state machine.
//!
//! This module translates host keyboard and pointer events into cursor mode
//! transitions and presence writes. The [`CursorMachine`] owns the local mode
//! (hidden, chatting, picking a reaction, broadcasting a reaction) and the
//! [`InputRouter`] maps raw events onto it and onto the presence store.

pub mod events;
pub mod modifiers;
pub mod router;
pub mod state;

pub use events::{Key, KeyDisposition, PointerEvent};
pub use modifiers::Modifiers;
pub use router::InputRouter;
pub use state::{CursorMachine, CursorMode, CursorState};
