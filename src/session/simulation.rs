use std::rc::Rc;
use std::time::Duration;

use log::info;

use super::live::{LiveSession, SessionError};
use crate::config::Config;
use crate::input::{Key, PointerEvent};
use crate::presence::Point;
use crate::presence::loopback::Room;
use crate::util::Rect;

/// What each side of a loopback run observed.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub duration: Duration,
    /// Reactions stored by the emitting participant at the end of the run
    pub sender_reactions: usize,
    /// Reactions the other participant received and still holds
    pub receiver_reactions: usize,
    /// Sender cursor as seen by the receiver
    pub peer_cursor: Option<Point>,
    /// Receiver chat message as seen by the sender
    pub peer_message: Option<String>,
}

/// Connects two sessions to a fresh in-process room, holds a reaction on one
/// and types a chat message on the other for `duration`.
///
/// Must be awaited inside a [`tokio::task::LocalSet`].
pub async fn run_loopback(
    config: &Config,
    duration: Duration,
) -> Result<SimulationReport, SessionError> {
    let room = Room::new();
    let sender_link = Rc::new(room.join());
    let receiver_link = Rc::new(room.join());
    let mut sender = LiveSession::connect(sender_link.clone(), sender_link.clone(), config)?;
    let mut receiver =
        LiveSession::connect(receiver_link.clone(), receiver_link.clone(), config)?;

    if let Some(surface) = Rect::new(0.0, 0.0, 800.0, 600.0) {
        sender.mount(surface);
        receiver.mount(surface);
    }

    let reaction = sender
        .reaction_choices()
        .first()
        .cloned()
        .unwrap_or_else(|| "👍".to_string());
    info!(
        "Simulating {} ms: connection {} holds {reaction}, connection {} chats",
        duration.as_millis(),
        sender_link.id(),
        receiver_link.id()
    );

    sender.on_pointer_move(PointerEvent::new(400.0, 300.0));
    sender.select_reaction(&reaction);
    sender.on_pointer_down(PointerEvent::new(400.0, 300.0));

    receiver.on_pointer_move(PointerEvent::new(120.0, 80.0));
    for key in [Key::Char('/'), Key::Char('h'), Key::Char('i')] {
        receiver.on_key_down(key);
        receiver.on_key_up(key);
    }

    tokio::time::sleep(duration).await;

    let report = SimulationReport {
        duration,
        sender_reactions: sender.stored_reactions().len(),
        receiver_reactions: receiver.stored_reactions().len(),
        peer_cursor: receiver
            .peers()
            .iter()
            .find(|peer| peer.connection_id == sender_link.id())
            .and_then(|peer| peer.presence.cursor),
        peer_message: sender
            .peers()
            .iter()
            .find(|peer| peer.connection_id == receiver_link.id())
            .and_then(|peer| peer.presence.message.clone()),
    };

    sender.disconnect();
    receiver.disconnect();
    sender_link.leave();
    receiver_link.leave();
    Ok(report)
}
