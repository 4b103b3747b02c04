use crate::config::Action;
use crate::input::events::{Key, KeyDisposition};
use crate::presence::PresencePatch;

use super::{CursorMachine, CursorState};

impl CursorMachine {
    /// Processes a key-down event.
    ///
    /// Key-down only does two things:
    /// - suppresses the host default for the open-chat key, so `/` never
    ///   triggers quick-find
    /// - edits the chat message while the chat bubble is open
    ///
    /// Mode transitions happen on key-up (see [`on_key_up`](Self::on_key_up)).
    pub fn on_key_down(&mut self, key: Key) -> KeyDisposition {
        if self.modifiers.track(key, true) {
            return KeyDisposition::PassThrough;
        }

        let action = key
            .binding_name()
            .and_then(|name| self.find_action(&name));

        if action == Some(Action::OpenChat) {
            return KeyDisposition::PreventDefault;
        }

        if matches!(self.state, CursorState::Chat { .. }) {
            match action {
                Some(Action::SubmitChat) => self.submit_chat(),
                Some(Action::Hide) => {}
                _ if self.modifiers.command_held() => {}
                _ => self.edit_chat(key),
            }
        }

        KeyDisposition::PassThrough
    }

    /// Processes a key-up event and applies the keyboard transitions:
    ///
    /// | key        | from              | to                      |
    /// |------------|-------------------|-------------------------|
    /// | open chat  | any               | `Chat` with empty input |
    /// | hide       | any               | `Hidden`, message `""`  |
    /// | picker     | any except `Chat` | `ReactionSelector`      |
    ///
    /// Unbound keys leave the state unchanged.
    pub fn on_key_up(&mut self, key: Key) {
        if self.modifiers.track(key, false) {
            return;
        }

        let Some(name) = key.binding_name() else {
            return;
        };
        if let Some(action) = self.find_action(&name) {
            self.handle_action(action);
        }
    }

    /// Handle an action triggered by a keybinding.
    pub(super) fn handle_action(&mut self, action: Action) {
        match action {
            Action::OpenChat => {
                self.set_state(CursorState::empty_chat());
            }
            Action::Hide => {
                self.queue_presence(PresencePatch::message(Some(String::new())));
                self.set_state(CursorState::Hidden);
            }
            Action::OpenReactionSelector => {
                if !matches!(self.state, CursorState::Chat { .. }) {
                    self.set_state(CursorState::ReactionSelector);
                }
            }
            Action::SubmitChat => {
                // Submission is a key-down edit; nothing to do on release.
            }
        }
    }

    /// Applies a typing key to the open chat bubble and publishes the result.
    ///
    /// Editing hides the previously submitted message.
    fn edit_chat(&mut self, key: Key) {
        let max_len = self.max_message_len();
        let CursorState::Chat {
            previous_message,
            message,
        } = &mut self.state
        else {
            return;
        };

        match key {
            Key::Char(c) if !c.is_control() => {
                if message.chars().count() >= max_len {
                    return;
                }
                message.push(c);
            }
            Key::Space => {
                if message.chars().count() >= max_len {
                    return;
                }
                message.push(' ');
            }
            Key::Backspace => {
                if message.pop().is_none() {
                    return;
                }
            }
            _ => return,
        }

        *previous_message = None;
        let published = message.clone();
        self.queue_presence(PresencePatch::message(Some(published)));
    }

    /// Moves the typed message into `previous_message` and clears the input.
    ///
    /// The published presence message is left as is so peers keep seeing it.
    fn submit_chat(&mut self) {
        if let CursorState::Chat { message, .. } = &mut self.state {
            let submitted = std::mem::take(message);
            self.state = CursorState::Chat {
                previous_message: Some(submitted),
                message: String::new(),
            };
        }
    }
}
