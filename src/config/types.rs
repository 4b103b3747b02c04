//! Configuration type definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reaction lifetime every participant in a room assumes, in milliseconds.
pub const ROOM_TTL_MS: u64 = 5000;

/// Expiry sweep period every participant in a room assumes, in milliseconds.
pub const ROOM_SWEEP_INTERVAL_MS: u64 = 1000;

/// Held-reaction emission period every participant in a room assumes, in milliseconds.
pub const ROOM_EMIT_INTERVAL_MS: u64 = 100;

/// Reaction timing and capacity settings.
///
/// The timing fields default to the room-wide values above. They are not
/// negotiated with peers: a different `ttl_ms` changes how long this client
/// shows everyone's reactions, and a different `emit_interval_ms` changes how
/// many reactions peers receive while this client holds one.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReactionsConfig {
    /// Time-to-live of a reaction in milliseconds (valid range: 500 - 60000)
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Period of the expiry sweep in milliseconds (valid range: 50 - 10000)
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Period of the held-reaction emitter in milliseconds (valid range: 16 - 2000)
    #[serde(default = "default_emit_interval_ms")]
    pub emit_interval_ms: u64,

    /// Maximum number of reactions kept at once; when full, the oldest is
    /// evicted before its TTL (valid range: 16 - 10000)
    #[serde(default = "default_max_active")]
    pub max_active: usize,

    /// Values offered by the reaction picker
    #[serde(default = "default_choices")]
    pub choices: Vec<String>,
}

impl Default for ReactionsConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            emit_interval_ms: default_emit_interval_ms(),
            max_active: default_max_active(),
            choices: default_choices(),
        }
    }
}

/// Cursor behaviour preferences.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CursorConfig {
    /// Keep the cursor in place while the reaction picker is open
    #[serde(default = "default_freeze_in_selector")]
    pub freeze_in_selector: bool,

    /// Maximum chat message length in characters (valid range: 1 - 1000)
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            freeze_in_selector: default_freeze_in_selector(),
            max_message_len: default_max_message_len(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_ttl_ms() -> u64 {
    ROOM_TTL_MS
}

fn default_sweep_interval_ms() -> u64 {
    ROOM_SWEEP_INTERVAL_MS
}

fn default_emit_interval_ms() -> u64 {
    ROOM_EMIT_INTERVAL_MS
}

// About 80 participants holding a reaction at once before anything is
// evicted ahead of its TTL (50 per holder per 5 s at the room timing).
fn default_max_active() -> usize {
    4096
}

pub(crate) fn default_choices() -> Vec<String> {
    ["👍", "🔥", "😍", "👀", "😱", "🙁"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_freeze_in_selector() -> bool {
    true
}

fn default_max_message_len() -> usize {
    100
}
