use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::task::LocalSet;
use tokio::time::sleep;

use super::*;
use crate::config::Config;
use crate::input::{CursorState, Key, KeyDisposition, PointerEvent};
use crate::presence::loopback::{Room, RoomConnection};
use crate::presence::{
    EventChannel, EventHandler, LocalPresence, Point, PresencePatch, PresenceStore, Subscription,
    TransportError,
};
use crate::util::Rect;

const ANCHOR_MS: i64 = 1_700_000_000_000;

fn join(room: &Room) -> (Rc<RoomConnection>, LiveSession) {
    let link = Rc::new(room.join());
    let session = LiveSession::connect_with_clock(
        link.clone(),
        link.clone(),
        &Config::default(),
        SessionClock::starting_at(ANCHOR_MS),
    )
    .unwrap();
    session.mount(Rect::new(0.0, 0.0, 800.0, 600.0).unwrap());
    (link, session)
}

fn broadcast_raw(link: &RoomConnection, payload: Value) {
    EventChannel::publish(link, payload).unwrap();
}

fn hold_reaction(session: &LiveSession, value: &str, x: f64, y: f64) {
    session.on_pointer_move(PointerEvent::new(x, y));
    session.select_reaction(value);
    session.on_pointer_down(PointerEvent::new(x, y));
}

#[tokio::test(start_paused = true)]
async fn held_reaction_emits_every_tick() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let (_alice_link, alice) = join(&room);
            let (_bob_link, bob) = join(&room);

            hold_reaction(&alice, "🔥", 50.0, 60.0);
            sleep(Duration::from_millis(1050)).await;

            let sent = alice.stored_reactions();
            let received = bob.stored_reactions();
            assert_eq!(sent.len(), 10);
            assert_eq!(received.len(), 10);
            assert_eq!(sent[0].timestamp, ANCHOR_MS + 100);
            assert_eq!(sent[9].timestamp, ANCHOR_MS + 1_000);
            for event in &received {
                assert_eq!(event.value, "🔥");
                assert_eq!(event.point, Point { x: 50.0, y: 60.0 });
            }
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn selected_but_unpressed_reaction_is_silent() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let (_alice_link, alice) = join(&room);
            let (_bob_link, bob) = join(&room);

            alice.on_pointer_move(PointerEvent::new(5.0, 5.0));
            alice.select_reaction("👀");
            sleep(Duration::from_millis(550)).await;

            assert!(alice.stored_reactions().is_empty());
            assert!(bob.stored_reactions().is_empty());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn emission_needs_a_published_cursor() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let (alice_link, alice) = join(&room);

            hold_reaction(&alice, "🔥", 50.0, 60.0);
            PresenceStore::publish(
                alice_link.as_ref(),
                PresencePatch {
                    cursor: Some(None),
                    message: None,
                },
            )
            .unwrap();
            sleep(Duration::from_millis(350)).await;

            assert!(alice.stored_reactions().is_empty());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn escape_stops_emission() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let (_alice_link, alice) = join(&room);
            let (_bob_link, bob) = join(&room);

            hold_reaction(&alice, "😍", 1.0, 1.0);
            sleep(Duration::from_millis(250)).await;
            alice.on_key_down(Key::Escape);
            alice.on_key_up(Key::Escape);
            sleep(Duration::from_millis(500)).await;

            assert_eq!(alice.cursor_state(), CursorState::Hidden);
            assert_eq!(bob.stored_reactions().len(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn inbound_reaction_expires_after_ttl() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let (_bob_link, bob) = join(&room);
            let carol = room.join();

            broadcast_raw(&carol, json!({ "x": 10.0, "y": 20.0, "value": "🎉" }));
            let stored = bob.stored_reactions();
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].timestamp, ANCHOR_MS);

            sleep(Duration::from_millis(4_999)).await;
            assert_eq!(bob.stored_reactions().len(), 1);
            assert_eq!(bob.snapshot().reactions.len(), 1);

            sleep(Duration::from_millis(2)).await;
            assert!(bob.stored_reactions().is_empty());
            assert!(bob.snapshot().reactions.is_empty());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn malformed_inbound_payloads_are_dropped() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let (_bob_link, bob) = join(&room);
            let carol = room.join();

            broadcast_raw(&carol, json!(null));
            broadcast_raw(&carol, json!({ "x": "left", "y": 2.0, "value": "🔥" }));
            broadcast_raw(&carol, json!({ "x": 1.0, "y": 2.0 }));
            broadcast_raw(&carol, json!({ "x": 1.0, "y": 2.0, "value": "" }));
            assert!(bob.stored_reactions().is_empty());

            broadcast_raw(&carol, json!({ "x": 1.0, "y": 2.0, "value": "🔥" }));
            assert_eq!(bob.stored_reactions().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_stops_timers_and_is_idempotent() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let (_alice_link, mut alice) = join(&room);
            let (_bob_link, mut bob) = join(&room);
            let carol = room.join();

            hold_reaction(&alice, "🔥", 50.0, 60.0);
            sleep(Duration::from_millis(250)).await;
            assert_eq!(bob.stored_reactions().len(), 2);

            alice.disconnect();
            alice.disconnect();
            assert!(!alice.is_connected());
            sleep(Duration::from_millis(500)).await;
            assert_eq!(bob.stored_reactions().len(), 2);

            bob.disconnect();
            broadcast_raw(&carol, json!({ "x": 1.0, "y": 2.0, "value": "🔥" }));
            assert_eq!(bob.stored_reactions().len(), 2);
            assert_eq!(bob.on_key_down(Key::Char('/')), KeyDisposition::PassThrough);
        })
        .await;
}

/// Channel that never forgets a handler, even after unsubscribe.
#[derive(Default)]
struct StickyChannel {
    handlers: RefCell<Vec<EventHandler>>,
}

impl StickyChannel {
    fn deliver(&self, payload: Value) {
        for handler in self.handlers.borrow().iter() {
            handler(payload.clone());
        }
    }
}

impl EventChannel for StickyChannel {
    fn publish(&self, _payload: Value) -> Result<(), TransportError> {
        Ok(())
    }

    fn subscribe(&self, handler: EventHandler) -> Subscription {
        self.handlers.borrow_mut().push(handler);
        Subscription::inert()
    }
}

#[tokio::test(start_paused = true)]
async fn late_callbacks_after_disconnect_do_nothing() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let link = Rc::new(room.join());
            let channel = Rc::new(StickyChannel::default());
            let mut session = LiveSession::connect(link.clone(), channel.clone(), &Config::default())
                .unwrap();

            channel.deliver(json!({ "x": 1.0, "y": 1.0, "value": "👍" }));
            assert_eq!(session.stored_reactions().len(), 1);

            session.disconnect();
            channel.deliver(json!({ "x": 2.0, "y": 2.0, "value": "👍" }));
            assert_eq!(session.stored_reactions().len(), 1);

            drop(session);
            channel.deliver(json!({ "x": 3.0, "y": 3.0, "value": "👍" }));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn peers_follow_presence_changes() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let (alice_link, alice) = join(&room);
            let (_bob_link, bob) = join(&room);

            alice.on_pointer_move(PointerEvent::new(10.0, 20.0));
            alice.on_key_down(Key::Char('/'));
            alice.on_key_up(Key::Char('/'));
            alice.on_key_down(Key::Char('o'));

            let peers = bob.peers();
            assert_eq!(peers.len(), 1);
            assert_eq!(peers[0].connection_id, alice_link.id());
            assert_eq!(
                peers[0].presence,
                LocalPresence {
                    cursor: Some(Point { x: 10.0, y: 20.0 }),
                    message: Some("o".to_string()),
                }
            );

            alice.on_pointer_leave();
            assert_eq!(bob.peers()[0].presence, LocalPresence::default());

            alice_link.leave();
            assert!(bob.peers().is_empty());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn snapshot_reports_reaction_progress() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let (_alice_link, alice) = join(&room);

            hold_reaction(&alice, "🙁", 30.0, 40.0);
            sleep(Duration::from_millis(150)).await;

            let snapshot = alice.snapshot();
            assert_eq!(
                snapshot.cursor_state,
                CursorState::Reaction {
                    reaction: "🙁".to_string(),
                    is_pressed: true,
                }
            );
            assert_eq!(snapshot.own.cursor, Some(Point { x: 30.0, y: 40.0 }));
            assert_eq!(snapshot.reactions.len(), 1);
            let view = &snapshot.reactions[0];
            assert_eq!(view.timestamp, ANCHOR_MS + 100);
            assert!((view.progress - 0.01).abs() < 1e-9);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn connect_clears_stale_presence() {
    LocalSet::new()
        .run_until(async {
            let room = Room::new();
            let link = Rc::new(room.join());
            PresenceStore::publish(link.as_ref(), PresencePatch::message(Some("old".into())))
                .unwrap();

            let session = LiveSession::connect(link.clone(), link.clone(), &Config::default())
                .unwrap();

            assert_eq!(session.own_presence(), LocalPresence::default());
            assert_eq!(session.reaction_choices().len(), 6);
        })
        .await;
}

#[test]
fn connect_rejects_conflicting_keybindings() {
    let room = Room::new();
    let link = Rc::new(room.join());
    let mut config = Config::default();
    config.keybindings.hide = vec!["e".to_string()];

    let result = LiveSession::connect(link.clone(), link.clone(), &config);

    assert!(matches!(result, Err(SessionError::Keybindings(_))));
}

#[test]
fn connect_fails_on_closed_transport() {
    let room = Room::new();
    let link = Rc::new(room.join());
    link.leave();

    let result = LiveSession::connect(link.clone(), link.clone(), &Config::default());

    assert!(matches!(
        result,
        Err(SessionError::Transport(TransportError::Disconnected))
    ));
}

#[tokio::test(start_paused = true)]
async fn loopback_simulation_reports_both_sides() {
    let report = LocalSet::new()
        .run_until(run_loopback(&Config::default(), Duration::from_millis(1_050)))
        .await
        .unwrap();

    assert_eq!(report.sender_reactions, 10);
    assert_eq!(report.receiver_reactions, 10);
    assert_eq!(report.peer_cursor, Some(Point { x: 400.0, y: 300.0 }));
    assert_eq!(report.peer_message.as_deref(), Some("hi"));
}
