//! In-process room transport.
//!
//! Every participant that joins a [`Room`] gets a [`RoomConnection`] which
//! implements both [`PresenceStore`] and [`EventChannel`]. Delivery is
//! synchronous on the calling thread: broadcasts reach every other
//! participant's handlers before `publish` returns and are never echoed back
//! to the sender.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use log::debug;
use serde_json::Value;

use super::{
    ConnectionId, EventChannel, EventHandler, LocalPresence, PeerPresence, PeersHandler,
    PresencePatch, PresenceStore, Subscription, TransportError,
};

type SharedPeersHandler = Rc<dyn Fn(&[PeerPresence])>;
type SharedEventHandler = Rc<dyn Fn(Value)>;

#[derive(Default)]
struct Participant {
    presence: LocalPresence,
    peer_handlers: Vec<(u64, SharedPeersHandler)>,
    event_handlers: Vec<(u64, SharedEventHandler)>,
}

#[derive(Default)]
struct RoomInner {
    next_connection: ConnectionId,
    next_subscription: u64,
    participants: BTreeMap<ConnectionId, Participant>,
}

impl RoomInner {
    fn others_of(&self, id: ConnectionId) -> Vec<PeerPresence> {
        self.participants
            .iter()
            .filter(|(other, _)| **other != id)
            .map(|(other, participant)| PeerPresence {
                connection_id: *other,
                presence: participant.presence.clone(),
            })
            .collect()
    }

    /// Collects (peer list, handlers) for every participant except `changed`.
    fn peer_notifications(
        &self,
        changed: ConnectionId,
    ) -> Vec<(Vec<PeerPresence>, Vec<SharedPeersHandler>)> {
        self.participants
            .iter()
            .filter(|(id, participant)| **id != changed && !participant.peer_handlers.is_empty())
            .map(|(id, participant)| {
                let handlers = participant
                    .peer_handlers
                    .iter()
                    .map(|(_, handler)| handler.clone())
                    .collect();
                (self.others_of(*id), handlers)
            })
            .collect()
    }
}

/// Shared in-process room.
#[derive(Clone, Default)]
pub struct Room {
    inner: Rc<RefCell<RoomInner>>,
}

impl Room {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a participant and returns its connection.
    pub fn join(&self) -> RoomConnection {
        let (id, notifications) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_connection;
            inner.next_connection += 1;
            inner.participants.insert(id, Participant::default());
            (id, inner.peer_notifications(id))
        };
        debug!("Connection {id} joined room");
        notify_peers(notifications);

        RoomConnection {
            id,
            room: Rc::downgrade(&self.inner),
            closed: Cell::new(false),
        }
    }

    pub fn participant_count(&self) -> usize {
        self.inner.borrow().participants.len()
    }
}

fn notify_peers(notifications: Vec<(Vec<PeerPresence>, Vec<SharedPeersHandler>)>) {
    for (peers, handlers) in notifications {
        for handler in handlers {
            handler(&peers);
        }
    }
}

/// One participant's view of a [`Room`].
pub struct RoomConnection {
    id: ConnectionId,
    room: Weak<RefCell<RoomInner>>,
    closed: Cell<bool>,
}

impl RoomConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get() || self.room.strong_count() == 0
    }

    /// Leaves the room. Peers are notified; later writes fail with
    /// [`TransportError::Disconnected`].
    pub fn leave(&self) {
        if self.closed.replace(true) {
            return;
        }
        let Some(room) = self.room.upgrade() else {
            return;
        };
        let notifications = {
            let mut inner = room.borrow_mut();
            inner.participants.remove(&self.id);
            inner.peer_notifications(self.id)
        };
        debug!("Connection {} left room", self.id);
        notify_peers(notifications);
    }

    fn room(&self) -> Result<Rc<RefCell<RoomInner>>, TransportError> {
        if self.closed.get() {
            return Err(TransportError::Disconnected);
        }
        self.room.upgrade().ok_or(TransportError::Disconnected)
    }

    fn next_subscription(inner: &mut RoomInner) -> u64 {
        let sub = inner.next_subscription;
        inner.next_subscription += 1;
        sub
    }
}

impl Drop for RoomConnection {
    fn drop(&mut self) {
        self.leave();
    }
}

impl PresenceStore for RoomConnection {
    fn publish(&self, patch: PresencePatch) -> Result<(), TransportError> {
        let room = self.room()?;
        let notifications = {
            let mut inner = room.borrow_mut();
            let participant = inner
                .participants
                .get_mut(&self.id)
                .ok_or(TransportError::Disconnected)?;
            patch.apply(&mut participant.presence);
            inner.peer_notifications(self.id)
        };
        notify_peers(notifications);
        Ok(())
    }

    fn read_own(&self) -> LocalPresence {
        self.room
            .upgrade()
            .and_then(|room| {
                room.borrow()
                    .participants
                    .get(&self.id)
                    .map(|participant| participant.presence.clone())
            })
            .unwrap_or_default()
    }

    fn others(&self) -> Vec<PeerPresence> {
        match self.room() {
            Ok(room) => room.borrow().others_of(self.id),
            Err(_) => Vec::new(),
        }
    }

    fn subscribe_others(&self, handler: PeersHandler) -> Subscription {
        let Ok(room) = self.room() else {
            return Subscription::inert();
        };
        let sub = {
            let mut inner = room.borrow_mut();
            let sub = Self::next_subscription(&mut inner);
            match inner.participants.get_mut(&self.id) {
                Some(participant) => participant.peer_handlers.push((sub, Rc::from(handler))),
                None => return Subscription::inert(),
            }
            sub
        };

        let id = self.id;
        let weak = Rc::downgrade(&room);
        Subscription::new(move || {
            if let Some(room) = weak.upgrade() {
                if let Some(participant) = room.borrow_mut().participants.get_mut(&id) {
                    participant.peer_handlers.retain(|(existing, _)| *existing != sub);
                }
            }
        })
    }
}

impl EventChannel for RoomConnection {
    fn publish(&self, payload: Value) -> Result<(), TransportError> {
        let room = self.room()?;
        let handlers: Vec<SharedEventHandler> = {
            let inner = room.borrow();
            if !inner.participants.contains_key(&self.id) {
                return Err(TransportError::Disconnected);
            }
            inner
                .participants
                .iter()
                .filter(|(id, _)| **id != self.id)
                .flat_map(|(_, participant)| participant.event_handlers.iter())
                .map(|(_, handler)| handler.clone())
                .collect()
        };

        for handler in handlers {
            handler(payload.clone());
        }
        Ok(())
    }

    fn subscribe(&self, handler: EventHandler) -> Subscription {
        let Ok(room) = self.room() else {
            return Subscription::inert();
        };
        let sub = {
            let mut inner = room.borrow_mut();
            let sub = Self::next_subscription(&mut inner);
            match inner.participants.get_mut(&self.id) {
                Some(participant) => participant.event_handlers.push((sub, Rc::from(handler))),
                None => return Subscription::inert(),
            }
            sub
        };

        let id = self.id;
        let weak = Rc::downgrade(&room);
        Subscription::new(move || {
            if let Some(room) = weak.upgrade() {
                if let Some(participant) = room.borrow_mut().participants.get_mut(&id) {
                    participant.event_handlers.retain(|(existing, _)| *existing != sub);
                }
            }
        })
    }
}
