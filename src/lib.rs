//! Client-side presence and reaction layer for a collaborative canvas.
//!
//! Exposes the cursor mode state machine and input router, the reaction
//! lifecycle, the presence/event transport interfaces (with an in-process
//! loopback room) and the live session that ties them together, so hosts can
//! embed the behaviour behind their own rendering and transport.

pub mod config;
pub mod input;
pub mod presence;
pub mod reaction;
pub mod session;
pub mod util;

pub use config::Config;
pub use session::{LiveSession, RenderSnapshot, SessionError};
