//! On-disk configuration
//!
//! A single TOML file describes the button table, the gesture timing and the
//! MIDI output. Missing fields fall back to the two-button reference board
//! (pull-up buttons on pins 32 and 35, 5ms debounce, 500ms long press, 300ms
//! double-tap window).
//!
//! ```toml
//! debounce_ms = 5
//! tick_interval_ms = 1
//!
//! [input]
//! long_press_ms = 500
//! double_tap_window_ms = 300
//!
//! [midi]
//! enabled = true
//! channel = 0
//!
//! [[buttons]]
//! id = 1
//! pin = { pin = 32, source = "Mcu" }
//! active_low = true
//! ```

use crate::hal::{ButtonDef, GpioPin};
use crate::input::{InputConfig, DEFAULT_DEBOUNCE_MS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("No config directory available on this system")]
    NoConfigDir,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct MidiConfig {
    pub enabled: bool,
    /// Substring of the output port name; first port when absent
    pub port_name: Option<String>,
    pub channel: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port_name: None,
            channel: 0,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub debounce_ms: u32,
    /// Period of the demo's polling loop
    pub tick_interval_ms: u64,
    pub input: InputConfig,
    pub midi: MidiConfig,
    pub buttons: Vec<ButtonDef>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            tick_interval_ms: 1,
            input: InputConfig::default(),
            midi: MidiConfig::default(),
            buttons: vec![
                ButtonDef::new(1, GpioPin::mcu(32), true),
                ButtonDef::new(2, GpioPin::mcu(35), true),
            ],
        }
    }
}

impl AppConfig {
    /// `<config dir>/opencontrol/input.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("opencontrol").join("input.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        info!(
            "Loaded config from {} ({} buttons)",
            path.display(),
            config.buttons.len()
        );
        Ok(config)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Loads `path` if it exists, otherwise writes and returns the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load_from(path);
        }
        warn!(
            "No config at {}, writing defaults",
            path.display()
        );
        let config = Self::default();
        config.save_to(path)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.long_press_ms == 0 {
            return Err(ConfigError::Invalid("long_press_ms must be > 0".into()));
        }
        if self.input.double_tap_window_ms == 0 {
            return Err(ConfigError::Invalid(
                "double_tap_window_ms must be > 0".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be > 0".into()));
        }
        if self.midi.channel > 15 {
            return Err(ConfigError::Invalid(format!(
                "MIDI channel {} out of range 0-15",
                self.midi.channel
            )));
        }

        let mut seen = HashSet::new();
        for button in &self.buttons {
            if button.id == 0 {
                return Err(ConfigError::Invalid("button id 0 is reserved".into()));
            }
            if !seen.insert(button.id) {
                return Err(ConfigError::Invalid(format!(
                    "button id {} defined twice",
                    button.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_reference_hardware() {
        let config = AppConfig::default();
        assert_eq!(config.debounce_ms, 5);
        assert_eq!(config.input.long_press_ms, 500);
        assert_eq!(config.input.double_tap_window_ms, 300);
        assert_eq!(config.buttons.len(), 2);
        assert!(config.buttons.iter().all(|b| b.active_low));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("input.toml");

        let mut config = AppConfig::default();
        config.input.long_press_ms = 800;
        config.midi.port_name = Some("Teensy".to_string());
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            debounce_ms = 10

            [[buttons]]
            id = 3
            pin = { pin = 4 }
            "#,
        )
        .unwrap();

        assert_eq!(config.debounce_ms, 10);
        assert_eq!(config.input, InputConfig::default());
        assert_eq!(config.buttons, vec![ButtonDef::new(3, GpioPin::mcu(4), true)]);
    }

    #[test]
    fn load_or_default_writes_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.toml");

        let config = AppConfig::load_or_default(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn rejects_duplicate_and_reserved_ids() {
        let mut config = AppConfig::default();
        config.buttons[1].id = 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.buttons[1].id = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_bad_timing_and_channel() {
        let mut config = AppConfig::default();
        config.input.long_press_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.midi.channel = 16;
        assert!(config.validate().is_err());
    }
}
