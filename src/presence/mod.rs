//! Presence store and event channel interfaces.
//!
//! A room transport exposes two capabilities: a replicated per-participant
//! presence record with change notification, and an unordered, at-most-once
//! broadcast channel for ephemeral events. Any concrete transport (WebSocket
//! relay, CRDT sync server, the in-process [`loopback::Room`]) satisfies the
//! two traits below.
//!
//! Everything here is single-threaded: handlers are `Rc`-friendly closures
//! invoked on the event loop that owns the session.

pub mod loopback;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canvas-local pixel coordinates (origin = top-left of the interactive surface).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// State this participant publishes to the room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalPresence {
    pub cursor: Option<Point>,
    pub message: Option<String>,
}

/// Read-only snapshot of another participant's published presence.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerPresence {
    pub connection_id: ConnectionId,
    pub presence: LocalPresence,
}

/// Identifier a transport assigns to each participant connection.
pub type ConnectionId = u32;

/// Partial presence update. `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresencePatch {
    pub cursor: Option<Option<Point>>,
    pub message: Option<Option<String>>,
}

impl PresencePatch {
    /// Moves the cursor to `point`.
    pub fn cursor(point: Point) -> Self {
        Self {
            cursor: Some(Some(point)),
            message: None,
        }
    }

    /// Replaces the published chat message.
    pub fn message(message: Option<String>) -> Self {
        Self {
            cursor: None,
            message: Some(message),
        }
    }

    /// Clears both cursor and message.
    pub fn clear() -> Self {
        Self {
            cursor: Some(None),
            message: Some(None),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.is_none() && self.message.is_none()
    }

    /// Folds a later patch into this one; fields set by `later` win.
    pub fn merge(&mut self, later: PresencePatch) {
        if later.cursor.is_some() {
            self.cursor = later.cursor;
        }
        if later.message.is_some() {
            self.message = later.message;
        }
    }

    /// Applies the patch to a presence record.
    pub fn apply(&self, presence: &mut LocalPresence) {
        if let Some(cursor) = self.cursor {
            presence.cursor = cursor;
        }
        if let Some(message) = &self.message {
            presence.message = message.clone();
        }
    }
}

/// Errors a transport may report for a write.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("room connection is closed")]
    Disconnected,

    #[error("transport rejected the update: {0}")]
    Rejected(String),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Guard for a transport subscription; dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to release (closed transports hand these out).
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    /// Unsubscribes now.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Callback receiving the full list of peers whenever any of them changes.
pub type PeersHandler = Box<dyn Fn(&[PeerPresence])>;

/// Callback receiving raw inbound event payloads.
pub type EventHandler = Box<dyn Fn(serde_json::Value)>;

/// Replicated key-value presence with change notification.
pub trait PresenceStore {
    /// Publishes a partial update of this participant's presence.
    fn publish(&self, patch: PresencePatch) -> Result<(), TransportError>;

    /// Returns this participant's current presence.
    fn read_own(&self) -> LocalPresence;

    /// Returns the current presence of every other participant.
    fn others(&self) -> Vec<PeerPresence>;

    /// Registers `handler` to be called with the peer list whenever it changes.
    fn subscribe_others(&self, handler: PeersHandler) -> Subscription;
}

/// Unordered, at-most-once, fire-and-forget broadcast channel.
pub trait EventChannel {
    /// Sends `payload` to every other participant. No acknowledgment, no retry.
    fn publish(&self, payload: serde_json::Value) -> Result<(), TransportError>;

    /// Registers `handler` for payloads broadcast by other participants.
    fn subscribe(&self, handler: EventHandler) -> Subscription;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn patch_apply_only_touches_set_fields() {
        let mut presence = LocalPresence {
            cursor: Some(Point { x: 1.0, y: 2.0 }),
            message: Some("hi".to_string()),
        };

        PresencePatch::message(Some(String::new())).apply(&mut presence);
        assert_eq!(presence.cursor, Some(Point { x: 1.0, y: 2.0 }));
        assert_eq!(presence.message.as_deref(), Some(""));

        PresencePatch::clear().apply(&mut presence);
        assert_eq!(presence, LocalPresence::default());
    }

    #[test]
    fn patch_merge_prefers_later_fields() {
        let mut patch = PresencePatch::cursor(Point { x: 5.0, y: 5.0 });
        patch.merge(PresencePatch::message(Some("a".to_string())));
        patch.merge(PresencePatch::clear());
        assert_eq!(patch, PresencePatch::clear());
        assert!(!patch.is_empty());
        assert!(PresencePatch::default().is_empty());
    }

    #[test]
    fn subscription_cancels_once_on_drop() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let sub = Subscription::new(move || counter.set(counter.get() + 1));
        drop(sub);
        assert_eq!(calls.get(), 1);

        let counter = calls.clone();
        Subscription::new(move || counter.set(counter.get() + 1)).cancel();
        assert_eq!(calls.get(), 2);
    }
}
