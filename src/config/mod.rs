//! Configuration file support for liveboard.
//!
//! This module handles loading and validating user settings from the configuration file
//! located at `~/.config/liveboard/config.toml`. Settings include reaction timing,
//! cursor behaviour, and keybindings.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod keybindings;
pub mod types;

pub use keybindings::{Action, KeyBinding, KeybindingsConfig};
pub use types::{
    CursorConfig, ROOM_EMIT_INTERVAL_MS, ROOM_SWEEP_INTERVAL_MS, ROOM_TTL_MS, ReactionsConfig,
};

use anyhow::{Context, Result};
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure containing all user settings.
///
/// # Example TOML
/// ```toml
/// [reactions]
/// ttl_ms = 5000
/// sweep_interval_ms = 1000
/// emit_interval_ms = 100
/// choices = ["👍", "🔥"]
///
/// [cursor]
/// freeze_in_selector = true
///
/// [keybindings]
/// open_chat = ["/"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Reaction lifetime, emission cadence and picker choices
    #[serde(default)]
    pub reactions: ReactionsConfig,

    /// Cursor and chat behaviour
    #[serde(default)]
    pub cursor: CursorConfig,

    /// Keyboard shortcuts for cursor modes
    #[serde(default)]
    pub keybindings: KeybindingsConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Invalid values are clamped to the nearest valid value and a warning is logged.
    ///
    /// Validated ranges:
    /// - `reactions.ttl_ms`: 500 - 60000
    /// - `reactions.sweep_interval_ms`: 50 - 10000
    /// - `reactions.emit_interval_ms`: 16 - 2000
    /// - `reactions.max_active`: 16 - 10000
    /// - `cursor.max_message_len`: 1 - 1000
    pub fn validate_and_clamp(&mut self) {
        if !(500..=60_000).contains(&self.reactions.ttl_ms) {
            log::warn!(
                "Invalid reactions.ttl_ms {}, clamping to 500-60000 range",
                self.reactions.ttl_ms
            );
            self.reactions.ttl_ms = self.reactions.ttl_ms.clamp(500, 60_000);
        }

        if !(50..=10_000).contains(&self.reactions.sweep_interval_ms) {
            log::warn!(
                "Invalid reactions.sweep_interval_ms {}, clamping to 50-10000 range",
                self.reactions.sweep_interval_ms
            );
            self.reactions.sweep_interval_ms = self.reactions.sweep_interval_ms.clamp(50, 10_000);
        }

        if !(16..=2000).contains(&self.reactions.emit_interval_ms) {
            log::warn!(
                "Invalid reactions.emit_interval_ms {}, clamping to 16-2000 range",
                self.reactions.emit_interval_ms
            );
            self.reactions.emit_interval_ms = self.reactions.emit_interval_ms.clamp(16, 2000);
        }

        if !(16..=10_000).contains(&self.reactions.max_active) {
            log::warn!(
                "Invalid reactions.max_active {}, clamping to 16-10000 range",
                self.reactions.max_active
            );
            self.reactions.max_active = self.reactions.max_active.clamp(16, 10_000);
        }

        if !self.uses_room_timing() {
            log::warn!(
                "reactions.ttl_ms {} / emit_interval_ms {} differ from the room timing ({} / {}); \
                 peers on the defaults will see different lifetimes and rates",
                self.reactions.ttl_ms,
                self.reactions.emit_interval_ms,
                ROOM_TTL_MS,
                ROOM_EMIT_INTERVAL_MS
            );
        }

        let before = self.reactions.choices.len();
        self.reactions.choices.retain(|choice| !choice.trim().is_empty());
        if self.reactions.choices.len() != before {
            log::warn!("Dropped {} empty reaction choice(s)", before - self.reactions.choices.len());
        }
        if self.reactions.choices.is_empty() {
            log::warn!("No reaction choices configured, falling back to defaults");
            self.reactions.choices = types::default_choices();
        }

        if !(1..=1000).contains(&self.cursor.max_message_len) {
            log::warn!(
                "Invalid cursor.max_message_len {}, clamping to 1-1000 range",
                self.cursor.max_message_len
            );
            self.cursor.max_message_len = self.cursor.max_message_len.clamp(1, 1000);
        }
    }

    /// Whether reaction lifetime and emission cadence match what peers assume.
    pub fn uses_room_timing(&self) -> bool {
        self.reactions.ttl_ms == ROOM_TTL_MS
            && self.reactions.emit_interval_ms == ROOM_EMIT_INTERVAL_MS
    }

    /// Returns the path to the configuration file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("liveboard");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the default location, or returns defaults if not found.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `config_path`, or returns defaults if the file is missing.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or contains invalid TOML.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Saves the current configuration to the default location.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created, the config cannot be
    /// serialized, or the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let config_str = self.to_toml()?;

        fs::write(&config_path, config_str)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        info!("Saved config to {}", config_path.display());
        Ok(())
    }

    /// Serializes the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Creates a default configuration file with documentation comments.
    ///
    /// # Errors
    /// Returns an error if a config file already exists at the target path, or
    /// if the directory or file cannot be written.
    pub fn create_default_file() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            return Err(anyhow::anyhow!(
                "Config file already exists at {}",
                config_path.display()
            ));
        }

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let default_config = include_str!("../../config.example.toml");
        fs::write(&config_path, default_config)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        info!("Created default config at {}", config_path.display());
        Ok(config_path)
    }

    /// JSON schema describing the config file format.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reaction_contract() {
        let config = Config::default();
        assert_eq!(config.reactions.ttl_ms, 5000);
        assert_eq!(config.reactions.sweep_interval_ms, 1000);
        assert_eq!(config.reactions.emit_interval_ms, 100);
        assert!(config.cursor.freeze_in_selector);
        assert_eq!(config.reactions.choices.len(), 6);
    }

    #[test]
    fn default_timing_is_room_timing() {
        let config = Config::default();
        assert!(config.uses_room_timing());
        assert_eq!(config.reactions.ttl_ms, ROOM_TTL_MS);
        assert_eq!(config.reactions.sweep_interval_ms, ROOM_SWEEP_INTERVAL_MS);
        assert_eq!(config.reactions.emit_interval_ms, ROOM_EMIT_INTERVAL_MS);
    }

    #[test]
    fn custom_timing_is_kept_but_flagged() {
        let mut config: Config = toml::from_str("[reactions]\nttl_ms = 8000\n").unwrap();
        config.validate_and_clamp();
        assert_eq!(config.reactions.ttl_ms, 8000);
        assert!(!config.uses_room_timing());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[reactions]\nttl_ms = 8000\n").unwrap();
        assert_eq!(config.reactions.ttl_ms, 8000);
        assert_eq!(config.reactions.emit_interval_ms, 100);
        assert_eq!(config.keybindings.open_chat, vec!["/".to_string()]);
    }

    #[test]
    fn validate_clamps_out_of_range_values() {
        let mut config = Config::default();
        config.reactions.ttl_ms = 10;
        config.reactions.emit_interval_ms = 0;
        config.reactions.max_active = 1_000_000;
        config.cursor.max_message_len = 0;

        config.validate_and_clamp();

        assert_eq!(config.reactions.ttl_ms, 500);
        assert_eq!(config.reactions.emit_interval_ms, 16);
        assert_eq!(config.reactions.max_active, 10_000);
        assert_eq!(config.cursor.max_message_len, 1);
    }

    #[test]
    fn validate_restores_default_choices_when_empty() {
        let mut config = Config::default();
        config.reactions.choices = vec!["  ".to_string()];
        config.validate_and_clamp();
        assert_eq!(config.reactions.choices, types::default_choices());
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.reactions.ttl_ms, 5000);
    }

    #[test]
    fn load_from_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[reactions\nttl_ms = ").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn load_from_validates_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[reactions]\nsweep_interval_ms = 1\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.reactions.sweep_interval_ms, 50);
    }

    #[test]
    fn example_file_parses() {
        let example: Config = toml::from_str(include_str!("../../config.example.toml")).unwrap();
        assert_eq!(example.reactions.ttl_ms, 5000);
        assert!(example.keybindings.build_action_map().is_ok());
    }

    #[test]
    fn to_toml_round_trips_sections() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[reactions]"));
        assert!(rendered.contains("[keybindings]"));
    }
}
