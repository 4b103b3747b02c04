//! Short-lived reaction events and the time-decaying set that holds them.
//!
//! Reactions are purely additive-then-expiring: each participant keeps its own
//! copy of the set, fed by local emission and by peer broadcasts, and entries
//! leave only by age.

mod lifecycle;

pub use lifecycle::{ReactionLifecycle, ReactionSettings};

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::presence::Point;

/// Milliseconds since the Unix epoch.
pub type EpochMs = i64;

/// Wire payload broadcast on the event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub x: f64,
    pub y: f64,
    pub value: String,
}

impl ReactionPayload {
    /// Decodes an inbound payload; returns `None` for anything malformed.
    pub fn from_wire(raw: Value) -> Option<Self> {
        let payload: Self = serde_json::from_value(raw).ok()?;
        if !payload.x.is_finite() || !payload.y.is_finite() || payload.value.is_empty() {
            return None;
        }
        Some(payload)
    }

    pub fn to_wire(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// A reaction anchored to a canvas point. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionEvent {
    pub point: Point,
    pub value: String,
    pub timestamp: EpochMs,
}

impl ReactionEvent {
    pub fn from_payload(payload: ReactionPayload, timestamp: EpochMs) -> Self {
        Self {
            point: Point {
                x: payload.x,
                y: payload.y,
            },
            value: payload.value,
            timestamp,
        }
    }

    /// Age at `now`, never negative.
    pub fn age_ms(&self, now: EpochMs) -> i64 {
        now.saturating_sub(self.timestamp).max(0)
    }

    /// Animation progress in `0.0..=1.0` (0 = just spawned, 1 = expired).
    pub fn progress(&self, now: EpochMs, ttl_ms: u64) -> f64 {
        if ttl_ms == 0 {
            return 1.0;
        }
        (self.age_ms(now) as f64 / ttl_ms as f64).clamp(0.0, 1.0)
    }

    pub fn is_expired(&self, now: EpochMs, ttl_ms: u64) -> bool {
        self.age_ms(now) >= ttl_ms.min(i64::MAX as u64) as i64
    }
}

/// Insertion-ordered, bounded collection of live reactions.
#[derive(Debug)]
pub struct ReactionSet {
    entries: VecDeque<ReactionEvent>,
    ttl_ms: u64,
    capacity: usize,
}

impl ReactionSet {
    pub fn new(ttl_ms: u64, capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            ttl_ms,
            capacity: capacity.max(1),
        }
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Appends an event, evicting the oldest entry when the set is full.
    pub fn push(&mut self, event: ReactionEvent) {
        if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                log::debug!(
                    "Reaction set full ({}), evicting '{}' from {}",
                    self.capacity,
                    evicted.value,
                    evicted.timestamp
                );
            }
        }
        self.entries.push_back(event);
    }

    /// Removes every entry whose age is at least the TTL; returns how many were removed.
    pub fn sweep(&mut self, now: EpochMs) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl_ms;
        self.entries.retain(|event| !event.is_expired(now, ttl));
        before - self.entries.len()
    }

    /// Entries still inside the TTL at `now`, in insertion order.
    ///
    /// Filters even between sweeps so an expired entry is never rendered.
    pub fn live(&self, now: EpochMs) -> impl Iterator<Item = &ReactionEvent> {
        let ttl = self.ttl_ms;
        self.entries
            .iter()
            .filter(move |event| !event.is_expired(now, ttl))
    }

    /// All stored entries, including ones awaiting the next sweep.
    pub fn iter(&self) -> impl Iterator<Item = &ReactionEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
