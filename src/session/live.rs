//! Live session: wires the router, the reaction lifecycle and a room transport
//! together and drives the periodic sweep and emission tasks.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::clock::SessionClock;
use crate::config::Config;
use crate::input::{CursorMachine, CursorState, InputRouter, Key, KeyDisposition, PointerEvent};
use crate::presence::{
    EventChannel, LocalPresence, PeerPresence, Point, PresencePatch, PresenceStore, Subscription,
    TransportError,
};
use crate::reaction::{
    EpochMs, ReactionEvent, ReactionLifecycle, ReactionPayload, ReactionSettings,
};
use crate::util::Rect;

/// Errors that can occur while connecting a live session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid keybindings: {0}")]
    Keybindings(String),

    #[error("failed to publish initial presence: {0}")]
    Transport(#[from] TransportError),
}

/// A reaction as the renderer should draw it right now.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionView {
    pub point: Point,
    pub value: String,
    pub timestamp: EpochMs,
    /// Animation progress, 0.0 when spawned and 1.0 at expiry
    pub progress: f64,
}

/// Everything the render layer reads for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub cursor_state: CursorState,
    pub own: LocalPresence,
    pub peers: Vec<PeerPresence>,
    pub reactions: Vec<ReactionView>,
}

struct LiveState {
    router: InputRouter,
    reactions: ReactionLifecycle,
    peers: Vec<PeerPresence>,
}

/// One participant's connected presence/reaction session.
///
/// All mutation happens on the thread that owns the session. Timers are
/// spawned with [`tokio::task::spawn_local`], so [`LiveSession::connect`] must
/// run inside a [`tokio::task::LocalSet`]. Disconnecting (or dropping the
/// session) cancels both timers and all subscriptions; callbacks that still
/// arrive afterwards do nothing.
pub struct LiveSession {
    shared: Rc<RefCell<LiveState>>,
    alive: Rc<Cell<bool>>,
    tasks: Vec<JoinHandle<()>>,
    subscriptions: Vec<Subscription>,
    presence: Rc<dyn PresenceStore>,
    clock: SessionClock,
    choices: Vec<String>,
}

impl LiveSession {
    /// Connects using a wall-clock anchored [`SessionClock`].
    pub fn connect(
        presence: Rc<dyn PresenceStore>,
        events: Rc<dyn EventChannel>,
        config: &Config,
    ) -> Result<Self, SessionError> {
        Self::connect_with_clock(presence, events, config, SessionClock::start())
    }

    /// Connects to a room transport.
    ///
    /// Publishes an empty presence, subscribes to peer presence and reaction
    /// broadcasts, then starts the sweep and emission timers.
    ///
    /// # Errors
    /// Fails if the configured keybindings are invalid or the initial presence
    /// write is rejected.
    ///
    /// # Panics
    /// Panics if called outside a [`tokio::task::LocalSet`].
    pub fn connect_with_clock(
        presence: Rc<dyn PresenceStore>,
        events: Rc<dyn EventChannel>,
        config: &Config,
        clock: SessionClock,
    ) -> Result<Self, SessionError> {
        let machine = CursorMachine::from_config(config).map_err(SessionError::Keybindings)?;
        presence.publish(PresencePatch::clear())?;

        let settings = ReactionSettings::from(&config.reactions);
        let shared = Rc::new(RefCell::new(LiveState {
            router: InputRouter::new(
                machine,
                presence.clone(),
                config.cursor.freeze_in_selector,
            ),
            reactions: ReactionLifecycle::new(settings),
            peers: presence.others(),
        }));
        let alive = Rc::new(Cell::new(true));

        let subscriptions = vec![
            subscribe_reactions(events.as_ref(), &shared, &alive, clock),
            subscribe_peers(presence.as_ref(), &shared, &alive),
        ];
        let tasks = vec![
            spawn_sweeper(&shared, &alive, clock, settings.sweep_interval),
            spawn_emitter(
                &shared,
                &alive,
                presence.clone(),
                events,
                clock,
                settings.emit_interval,
            ),
        ];

        info!(
            "Live session connected (ttl {:?}, sweep {:?}, emit {:?})",
            settings.ttl, settings.sweep_interval, settings.emit_interval
        );

        Ok(Self {
            shared,
            alive,
            tasks,
            subscriptions,
            presence,
            clock,
            choices: config.reactions.choices.clone(),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.alive.get()
    }

    /// Stops both timers and drops all subscriptions. Idempotent.
    pub fn disconnect(&mut self) {
        if !self.alive.replace(false) {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.subscriptions.clear();
        info!("Live session disconnected");
    }

    fn with_router<R>(&self, f: impl FnOnce(&mut InputRouter) -> R) -> Option<R> {
        if !self.alive.get() {
            return None;
        }
        let mut state = self.shared.borrow_mut();
        Some(f(&mut state.router))
    }

    pub fn mount(&self, bounds: Rect) {
        self.with_router(|router| router.mount(bounds));
    }

    pub fn unmount(&self) {
        self.with_router(|router| router.unmount());
    }

    pub fn on_pointer_move(&self, event: PointerEvent) {
        self.with_router(|router| router.on_pointer_move(event));
    }

    pub fn on_pointer_down(&self, event: PointerEvent) {
        self.with_router(|router| router.on_pointer_down(event));
    }

    pub fn on_pointer_up(&self, event: PointerEvent) {
        self.with_router(|router| router.on_pointer_up(event));
    }

    pub fn on_pointer_leave(&self) {
        self.with_router(|router| router.on_pointer_leave());
    }

    /// Routes a key press; the host must honour the returned disposition.
    pub fn on_key_down(&self, key: Key) -> KeyDisposition {
        self.with_router(|router| router.on_key_down(key))
            .unwrap_or(KeyDisposition::PassThrough)
    }

    pub fn on_key_up(&self, key: Key) {
        self.with_router(|router| router.on_key_up(key));
    }

    pub fn select_reaction(&self, value: &str) {
        self.with_router(|router| router.select_reaction(value));
    }

    /// Values the reaction picker should offer.
    pub fn reaction_choices(&self) -> &[String] {
        &self.choices
    }

    pub fn cursor_state(&self) -> CursorState {
        self.shared.borrow().router.cursor_state().clone()
    }

    pub fn own_presence(&self) -> LocalPresence {
        self.presence.read_own()
    }

    pub fn peers(&self) -> Vec<PeerPresence> {
        self.shared.borrow().peers.clone()
    }

    /// Every stored reaction, including expired ones awaiting the next sweep.
    pub fn stored_reactions(&self) -> Vec<ReactionEvent> {
        self.shared
            .borrow()
            .reactions
            .reactions()
            .iter()
            .cloned()
            .collect()
    }

    /// Read-only view for the render layer. Reactions past their TTL are
    /// never included, even if the sweep has not run yet.
    pub fn snapshot(&self) -> RenderSnapshot {
        let now = self.clock.now_ms();
        let state = self.shared.borrow();
        let set = state.reactions.reactions();
        let ttl_ms = set.ttl_ms();

        RenderSnapshot {
            cursor_state: state.router.cursor_state().clone(),
            own: self.presence.read_own(),
            peers: state.peers.clone(),
            reactions: set
                .live(now)
                .map(|event| ReactionView {
                    point: event.point,
                    value: event.value.clone(),
                    timestamp: event.timestamp,
                    progress: event.progress(now, ttl_ms),
                })
                .collect(),
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn subscribe_reactions(
    events: &dyn EventChannel,
    shared: &Rc<RefCell<LiveState>>,
    alive: &Rc<Cell<bool>>,
    clock: SessionClock,
) -> Subscription {
    let weak = Rc::downgrade(shared);
    let alive = alive.clone();
    events.subscribe(Box::new(move |raw| {
        let Some(shared) = upgrade_live(&weak, &alive) else {
            return;
        };
        let Ok(mut state) = shared.try_borrow_mut() else {
            debug!("Session busy, dropping inbound reaction");
            return;
        };
        state.reactions.on_inbound(raw, clock.now_ms());
    }))
}

fn subscribe_peers(
    presence: &dyn PresenceStore,
    shared: &Rc<RefCell<LiveState>>,
    alive: &Rc<Cell<bool>>,
) -> Subscription {
    let weak = Rc::downgrade(shared);
    let alive = alive.clone();
    presence.subscribe_others(Box::new(move |peers: &[PeerPresence]| {
        let Some(shared) = upgrade_live(&weak, &alive) else {
            return;
        };
        let Ok(mut state) = shared.try_borrow_mut() else {
            debug!("Session busy, dropping peer presence update");
            return;
        };
        state.peers = peers.to_vec();
    }))
}

/// Returns the shared state only while the session is still connected.
fn upgrade_live(
    weak: &Weak<RefCell<LiveState>>,
    alive: &Cell<bool>,
) -> Option<Rc<RefCell<LiveState>>> {
    if !alive.get() {
        return None;
    }
    weak.upgrade()
}

fn ticker(period: Duration) -> time::Interval {
    // First tick one period after start, like a host interval timer.
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn spawn_sweeper(
    shared: &Rc<RefCell<LiveState>>,
    alive: &Rc<Cell<bool>>,
    clock: SessionClock,
    period: Duration,
) -> JoinHandle<()> {
    let weak = Rc::downgrade(shared);
    let alive = alive.clone();
    tokio::task::spawn_local(async move {
        let mut interval = ticker(period);
        loop {
            interval.tick().await;
            let Some(shared) = upgrade_live(&weak, &alive) else {
                break;
            };
            shared.borrow_mut().reactions.sweep(clock.now_ms());
        }
    })
}

fn spawn_emitter(
    shared: &Rc<RefCell<LiveState>>,
    alive: &Rc<Cell<bool>>,
    presence: Rc<dyn PresenceStore>,
    events: Rc<dyn EventChannel>,
    clock: SessionClock,
    period: Duration,
) -> JoinHandle<()> {
    let weak = Rc::downgrade(shared);
    let alive = alive.clone();
    tokio::task::spawn_local(async move {
        let mut interval = ticker(period);
        loop {
            interval.tick().await;
            let Some(shared) = upgrade_live(&weak, &alive) else {
                break;
            };

            let cursor = presence.read_own().cursor;
            let payload = {
                let mut guard = shared.borrow_mut();
                let state = &mut *guard;
                state
                    .reactions
                    .emit_tick(state.router.cursor_state(), cursor, clock.now_ms())
            };

            // The borrow is released before publishing so synchronous
            // transports may call back into any session.
            if let Some(payload) = payload {
                broadcast(events.as_ref(), &payload);
            }
        }
    })
}

fn broadcast(events: &dyn EventChannel, payload: &ReactionPayload) {
    let result = payload
        .to_wire()
        .map_err(TransportError::from)
        .and_then(|wire| events.publish(wire));
    if let Err(err) = result {
        warn!("Reaction broadcast failed: {err}");
    }
}
