mod core;
mod keyboard;
mod pointer;

pub use self::core::{CursorMachine, CursorMode, CursorState};
