use std::time::Duration;

use serde_json::Value;

use super::{EpochMs, ReactionEvent, ReactionPayload, ReactionSet};
use crate::config::ReactionsConfig;
use crate::input::CursorState;
use crate::presence::Point;

/// Runtime settings for reaction expiry and emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionSettings {
    pub ttl: Duration,
    pub sweep_interval: Duration,
    pub emit_interval: Duration,
    pub max_active: usize,
}

impl Default for ReactionSettings {
    fn default() -> Self {
        Self::from(&ReactionsConfig::default())
    }
}

impl From<&ReactionsConfig> for ReactionSettings {
    fn from(cfg: &ReactionsConfig) -> Self {
        ReactionSettings {
            ttl: Duration::from_millis(cfg.ttl_ms),
            sweep_interval: Duration::from_millis(cfg.sweep_interval_ms),
            emit_interval: Duration::from_millis(cfg.emit_interval_ms),
            max_active: cfg.max_active,
        }
    }
}

/// Owns the local reaction set and the rules for feeding and draining it.
///
/// The periodic sweep and emission tasks and the inbound channel handler all
/// call into this type; none of its methods block.
#[derive(Debug)]
pub struct ReactionLifecycle {
    settings: ReactionSettings,
    set: ReactionSet,
}

impl ReactionLifecycle {
    pub fn new(settings: ReactionSettings) -> Self {
        let ttl_ms = settings.ttl.as_millis().min(u64::MAX as u128) as u64;
        Self {
            settings,
            set: ReactionSet::new(ttl_ms, settings.max_active),
        }
    }

    pub fn settings(&self) -> &ReactionSettings {
        &self.settings
    }

    pub fn reactions(&self) -> &ReactionSet {
        &self.set
    }

    /// Sweep step: drops every reaction whose age has reached the TTL.
    pub fn sweep(&mut self, now: EpochMs) -> usize {
        let removed = self.set.sweep(now);
        if removed > 0 {
            log::debug!("Swept {removed} expired reaction(s), {} live", self.set.len());
        }
        removed
    }

    /// Emission step: while a reaction is held over a known cursor, records one
    /// local reaction and returns the payload to broadcast.
    pub fn emit_tick(
        &mut self,
        state: &CursorState,
        cursor: Option<Point>,
        now: EpochMs,
    ) -> Option<ReactionPayload> {
        let CursorState::Reaction {
            reaction,
            is_pressed: true,
        } = state
        else {
            return None;
        };
        let cursor = cursor?;

        let payload = ReactionPayload {
            x: cursor.x,
            y: cursor.y,
            value: reaction.clone(),
        };
        self.set
            .push(ReactionEvent::from_payload(payload.clone(), now));
        Some(payload)
    }

    /// Inbound step: records a peer reaction stamped with the receipt time.
    ///
    /// Malformed payloads are dropped; returns whether the payload was kept.
    pub fn on_inbound(&mut self, raw: Value, now: EpochMs) -> bool {
        match ReactionPayload::from_wire(raw) {
            Some(payload) => {
                self.set.push(ReactionEvent::from_payload(payload, now));
                true
            }
            None => {
                log::debug!("Dropping malformed reaction payload");
                false
            }
        }
    }
}
