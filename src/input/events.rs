//! Generic input event types for cross-host compatibility.

/// Generic key representation.
///
/// Hosts map their native key codes to these values; printable keys arrive
/// already shifted (`'/'`, `'E'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Regular character key (a-z, 0-9, symbols)
    Char(char),
    /// Escape key
    Escape,
    /// Return/Enter key
    Return,
    /// Backspace key
    Backspace,
    /// Space bar
    Space,
    /// Shift modifier
    Shift,
    /// Ctrl modifier
    Ctrl,
    /// Alt modifier
    Alt,
    /// Unmapped or unrecognized key
    Unknown,
}

impl Key {
    /// Name used for keybinding lookup, or `None` for keys that cannot be bound.
    pub fn binding_name(&self) -> Option<String> {
        match self {
            Key::Char(c) => Some(c.to_string()),
            Key::Escape => Some("Escape".to_string()),
            Key::Return => Some("Return".to_string()),
            Key::Backspace => Some("Backspace".to_string()),
            Key::Space => Some("Space".to_string()),
            Key::Shift | Key::Ctrl | Key::Alt | Key::Unknown => None,
        }
    }
}

/// Raw pointer event in host client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub client_x: f64,
    pub client_y: f64,
}

impl PointerEvent {
    pub fn new(client_x: f64, client_y: f64) -> Self {
        Self { client_x, client_y }
    }
}

/// What the host should do with a key-down after it has been routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Let the host run its default handling
    PassThrough,
    /// Suppress the host's default handling (e.g. quick-find on `/`)
    PreventDefault,
}
