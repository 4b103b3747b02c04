//! Live presence/reaction sessions.
//!
//! A [`LiveSession`] binds one participant's input router and reaction
//! lifecycle to a room transport, runs the sweep and emission timers, and
//! exposes a [`RenderSnapshot`] for drawing. [`run_loopback`] drives two
//! sessions against an in-process room for demos and smoke tests.

mod clock;
mod live;
mod simulation;

pub use clock::SessionClock;
pub use live::{LiveSession, ReactionView, RenderSnapshot, SessionError};
pub use simulation::{SimulationReport, run_loopback};

#[cfg(test)]
mod tests;
