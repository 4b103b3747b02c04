//! Cursor mode state machine.

use crate::config::{Action, Config, KeyBinding};
use crate::input::modifiers::Modifiers;
use crate::presence::PresencePatch;
use std::collections::HashMap;

/// What the local pointer currently means.
///
/// Exactly one mode is active at a time. The state is owned by the local
/// participant and never shared with peers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CursorState {
    /// Plain cursor, no bubble (initial state)
    #[default]
    Hidden,
    /// Chat bubble open next to the cursor
    Chat {
        /// Last submitted message, shown above the input
        previous_message: Option<String>,
        /// Message being typed
        message: String,
    },
    /// Reaction picker overlay is open
    ReactionSelector,
    /// A reaction is chosen; while pressed it is emitted at the cursor
    Reaction {
        /// Chosen reaction value (usually an emoji)
        reaction: String,
        /// Whether the pointer has been pressed since the reaction was chosen
        is_pressed: bool,
    },
}

/// Fieldless discriminant of [`CursorState`], handy for logging and comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorMode {
    Hidden,
    Chat,
    ReactionSelector,
    Reaction,
}

impl CursorState {
    pub fn mode(&self) -> CursorMode {
        match self {
            CursorState::Hidden => CursorMode::Hidden,
            CursorState::Chat { .. } => CursorMode::Chat,
            CursorState::ReactionSelector => CursorMode::ReactionSelector,
            CursorState::Reaction { .. } => CursorMode::Reaction,
        }
    }

    /// Fresh, empty chat bubble.
    pub fn empty_chat() -> Self {
        CursorState::Chat {
            previous_message: None,
            message: String::new(),
        }
    }
}

/// Cursor mode state machine plus the keyboard context it needs.
///
/// Transitions never touch the transport directly: presence writes they imply
/// are queued and drained by the router with [`take_pending_presence`].
///
/// [`take_pending_presence`]: CursorMachine::take_pending_presence
pub struct CursorMachine {
    /// Current cursor mode
    pub state: CursorState,
    /// Current modifier key state
    pub modifiers: Modifiers,
    /// Keybinding action map
    action_map: HashMap<KeyBinding, Action>,
    /// Chat message length cap, in characters
    max_message_len: usize,
    /// Presence write implied by the last transitions
    pending_presence: Option<PresencePatch>,
}

impl CursorMachine {
    /// Creates a machine in the `Hidden` state.
    pub fn new(action_map: HashMap<KeyBinding, Action>, max_message_len: usize) -> Self {
        Self {
            state: CursorState::Hidden,
            modifiers: Modifiers::new(),
            action_map,
            max_message_len: max_message_len.max(1),
            pending_presence: None,
        }
    }

    /// Builds a machine from user configuration.
    ///
    /// # Errors
    /// Returns the keybinding parser's message for invalid or duplicate bindings.
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let action_map = config.keybindings.build_action_map()?;
        Ok(Self::new(action_map, config.cursor.max_message_len))
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }

    /// Look up an action for the given key and current modifiers.
    pub(super) fn find_action(&self, key_str: &str) -> Option<Action> {
        self.action_map
            .iter()
            .find(|(binding, _)| {
                binding.matches(
                    key_str,
                    self.modifiers.ctrl,
                    self.modifiers.shift,
                    self.modifiers.alt,
                )
            })
            .map(|(_, action)| *action)
    }

    /// Replaces the state, logging mode changes.
    pub(super) fn set_state(&mut self, next: CursorState) {
        if self.state.mode() != next.mode() {
            log::debug!("Cursor mode {:?} -> {:?}", self.state.mode(), next.mode());
        }
        self.state = next;
    }

    /// Queues a presence write, merging with anything not yet drained.
    pub(super) fn queue_presence(&mut self, patch: PresencePatch) {
        match &mut self.pending_presence {
            Some(pending) => pending.merge(patch),
            None => self.pending_presence = Some(patch),
        }
    }

    /// Takes and clears the presence write implied by recent transitions.
    pub fn take_pending_presence(&mut self) -> Option<PresencePatch> {
        self.pending_presence.take().filter(|patch| !patch.is_empty())
    }

    /// A reaction was picked in the (external) selector UI.
    ///
    /// Valid from any mode; empty values are ignored.
    pub fn select_reaction(&mut self, value: &str) {
        if value.is_empty() {
            log::debug!("Ignoring empty reaction selection");
            return;
        }
        self.set_state(CursorState::Reaction {
            reaction: value.to_string(),
            is_pressed: false,
        });
    }

    /// Whether pointer motion should move the published cursor.
    pub fn allows_cursor_move(&self, freeze_in_selector: bool) -> bool {
        !(freeze_in_selector && matches!(self.state, CursorState::ReactionSelector))
    }
}
