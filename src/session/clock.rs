use chrono::Utc;
use tokio::time::Instant;

use crate::reaction::EpochMs;

/// Epoch-millisecond clock for one live session.
///
/// Anchored to the wall clock at start and advanced by monotonic elapsed time,
/// so timestamps never go backwards within a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    anchor_ms: EpochMs,
    origin: Instant,
}

impl SessionClock {
    /// Starts a clock anchored at the current wall-clock time.
    pub fn start() -> Self {
        Self::starting_at(Utc::now().timestamp_millis())
    }

    /// Starts a clock that reads `anchor_ms` right now.
    pub fn starting_at(anchor_ms: EpochMs) -> Self {
        Self {
            anchor_ms,
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> EpochMs {
        let elapsed = self.origin.elapsed().as_millis().min(i64::MAX as u128) as i64;
        self.anchor_ms.saturating_add(elapsed)
    }
}
