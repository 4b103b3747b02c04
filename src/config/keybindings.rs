//! Keybinding configuration types and parsing.
//!
//! Maps keyboard shortcuts onto cursor-mode actions (open chat, hide, open the
//! reaction picker, submit a chat message).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All possible actions that can be bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Open (or restart) the cursor chat bubble
    OpenChat,
    /// Hide the cursor bubble and clear the published message
    Hide,
    /// Open the reaction picker (ignored while chatting)
    OpenReactionSelector,
    /// Commit the current chat message
    SubmitChat,
}

/// A single keybinding: a key with optional modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyBinding {
    /// Parse a keybinding string like "Ctrl+Shift+W", "/" or "Escape".
    /// Modifiers can appear in any order and spaces around '+' are accepted.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Empty keybinding string".to_string());
        }

        let s_normalized = s.replace(" + ", "+").replace("+ ", "+").replace(" +", "+");
        let parts: Vec<&str> = s_normalized.split('+').collect();

        let mut ctrl = false;
        let mut shift = false;
        let mut alt = false;
        let mut key_parts = Vec::new();

        for part in parts {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" => ctrl = true,
                "shift" => shift = true,
                "alt" => alt = true,
                _ => key_parts.push(part),
            }
        }

        if key_parts.is_empty() {
            return Err(format!("No key specified in: {}", s));
        }

        // "Ctrl++" splits into ["Ctrl", "", ""]: the key itself is '+'
        let key = key_parts.join("+");
        let key = if key.is_empty() { "+".to_string() } else { key };

        Ok(Self {
            key,
            ctrl,
            shift,
            alt,
        })
    }

    /// Check if this keybinding matches the current input state.
    ///
    /// Single printable characters already carry their shift level ("/" vs "?",
    /// "e" vs "E"), so they are compared exactly and shift is only checked when
    /// the binding asks for it. Ctrl/Alt chords compare the character without
    /// case, since hosts differ in what they report for them. Named keys
    /// ("Escape", "Return") ignore case and always check shift.
    pub fn matches(&self, key: &str, ctrl: bool, shift: bool, alt: bool) -> bool {
        if self.ctrl != ctrl || self.alt != alt {
            return false;
        }

        let printable = key.chars().count() == 1;
        if !printable {
            return self.key.eq_ignore_ascii_case(key) && self.shift == shift;
        }

        let key_ok = if self.ctrl || self.alt {
            self.key.eq_ignore_ascii_case(key)
        } else {
            self.key == key
        };
        key_ok && (!self.shift || shift)
    }
}

/// Configuration for all keybindings.
///
/// Each action can have multiple keybindings:
/// ```toml
/// [keybindings]
/// open_chat = ["/"]
/// hide = ["Escape"]
/// open_reaction_selector = ["e"]
/// submit_chat = ["Return"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KeybindingsConfig {
    #[serde(default = "default_open_chat")]
    pub open_chat: Vec<String>,

    #[serde(default = "default_hide")]
    pub hide: Vec<String>,

    #[serde(default = "default_open_reaction_selector")]
    pub open_reaction_selector: Vec<String>,

    #[serde(default = "default_submit_chat")]
    pub submit_chat: Vec<String>,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            open_chat: default_open_chat(),
            hide: default_hide(),
            open_reaction_selector: default_open_reaction_selector(),
            submit_chat: default_submit_chat(),
        }
    }
}

impl KeybindingsConfig {
    /// Build a lookup map from keybindings to actions for efficient matching.
    /// Returns an error if any keybinding string is invalid or if duplicates are detected.
    pub fn build_action_map(&self) -> Result<HashMap<KeyBinding, Action>, String> {
        let mut map = HashMap::new();

        let mut insert_binding = |binding_str: &str, action: Action| -> Result<(), String> {
            let binding = KeyBinding::parse(binding_str)?;
            if let Some(existing_action) = map.insert(binding.clone(), action) {
                return Err(format!(
                    "Duplicate keybinding '{}' assigned to both {:?} and {:?}",
                    binding_str, existing_action, action
                ));
            }
            Ok(())
        };

        let groups = [
            (&self.open_chat, Action::OpenChat),
            (&self.hide, Action::Hide),
            (&self.open_reaction_selector, Action::OpenReactionSelector),
            (&self.submit_chat, Action::SubmitChat),
        ];

        for (bindings, action) in groups {
            for binding_str in bindings {
                insert_binding(binding_str, action)?;
            }
        }

        Ok(map)
    }
}

// =============================================================================
// Default keybinding functions
// =============================================================================

fn default_open_chat() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_hide() -> Vec<String> {
    vec!["Escape".to_string()]
}

fn default_open_reaction_selector() -> Vec<String> {
    vec!["e".to_string()]
}

fn default_submit_chat() -> Vec<String> {
    vec!["Return".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_key() {
        let binding = KeyBinding::parse("Escape").unwrap();
        assert_eq!(binding.key, "Escape");
        assert!(!binding.ctrl);
        assert!(!binding.shift);
        assert!(!binding.alt);
    }

    #[test]
    fn test_parse_slash() {
        let binding = KeyBinding::parse("/").unwrap();
        assert_eq!(binding.key, "/");
    }

    #[test]
    fn test_parse_plus_key() {
        let binding = KeyBinding::parse("Ctrl++").unwrap();
        assert_eq!(binding.key, "+");
        assert!(binding.ctrl);
    }

    #[test]
    fn test_parse_with_spaces_and_order() {
        let a = KeyBinding::parse("Ctrl + Alt + K").unwrap();
        let b = KeyBinding::parse("Alt+Ctrl+K").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_rejects_modifier_only() {
        assert!(KeyBinding::parse("Ctrl+Shift").is_err());
        assert!(KeyBinding::parse("   ").is_err());
    }

    #[test]
    fn test_matches_printable_ignores_shift() {
        let binding = KeyBinding::parse("/").unwrap();
        assert!(binding.matches("/", false, false, false));
        assert!(binding.matches("/", false, true, false));
        assert!(!binding.matches("/", true, false, false));
    }

    #[test]
    fn test_matches_named_key_checks_shift() {
        let binding = KeyBinding::parse("Return").unwrap();
        assert!(binding.matches("Return", false, false, false));
        assert!(!binding.matches("Return", false, true, false));
    }

    #[test]
    fn test_matches_printable_is_case_sensitive() {
        let binding = KeyBinding::parse("e").unwrap();
        assert!(binding.matches("e", false, false, false));
        assert!(!binding.matches("E", false, false, false));
        assert!(!binding.matches("E", false, true, false));
    }

    #[test]
    fn test_matches_chord_ignores_case() {
        let binding = KeyBinding::parse("Ctrl+R").unwrap();
        assert!(binding.matches("r", true, false, false));
        assert!(binding.matches("R", true, false, false));
        assert!(!binding.matches("r", false, false, false));
    }

    #[test]
    fn test_matches_named_key_ignores_case() {
        let binding = KeyBinding::parse("escape").unwrap();
        assert!(binding.matches("Escape", false, false, false));
    }

    #[test]
    fn test_build_action_map() {
        let map = KeybindingsConfig::default().build_action_map().unwrap();

        let slash = KeyBinding::parse("/").unwrap();
        assert_eq!(map.get(&slash), Some(&Action::OpenChat));

        let escape = KeyBinding::parse("Escape").unwrap();
        assert_eq!(map.get(&escape), Some(&Action::Hide));

        let e = KeyBinding::parse("e").unwrap();
        assert_eq!(map.get(&e), Some(&Action::OpenReactionSelector));
    }

    #[test]
    fn test_duplicate_keybinding_detection() {
        let mut config = KeybindingsConfig::default();
        config.hide = vec!["/".to_string()];

        let err_msg = config.build_action_map().unwrap_err();
        assert!(err_msg.contains("Duplicate keybinding"));
        assert!(err_msg.contains('/'));
    }
}
