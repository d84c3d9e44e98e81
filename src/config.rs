//! # Board Simulator Configuration
//!
//! Every field has a default, so an empty file (or no file at all) gives an
//! Arduino Uno at 5 V with a 9600 baud serial port.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [board]
//! model = "nano"
//! reference_voltage = 5.0
//!
//! [serial]
//! baud = 115200
//! lookahead = "skip_all"
//! ignore = "\n"
//!
//! [debug]
//! digital_write = true
//! timestamp = true
//!
//! [runner]
//! max_loops = 1000
//! # 0 busy-polls; keep at least 1 for sketches that poll serial input
//! loop_delay_ms = 1
//! ```

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::BoardModel;
use crate::serial::LookaheadMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the board, serial port, debug traces and run loop.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Board model and analog reference.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub model: BoardModel,
    #[serde(default = "default_reference_voltage")]
    pub reference_voltage: f32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            model: BoardModel::default(),
            reference_voltage: default_reference_voltage(),
        }
    }
}

/// Serial port defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default)]
    pub lookahead: LookaheadMode,
    #[serde(default = "default_ignore")]
    pub ignore: char,
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

impl SerialConfig {
    /// Ignore character as a byte. Non-ASCII characters are rejected by
    /// [`Config::validate`]; here they fall back to a newline.
    pub fn ignore_byte(&self) -> u8 {
        if self.ignore.is_ascii() {
            self.ignore as u8
        } else {
            b'\n'
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud: default_baud(),
            lookahead: LookaheadMode::default(),
            ignore: default_ignore(),
            prompt: default_prompt(),
        }
    }
}

/// Per-operation debug traces. Each flag makes the matching board call emit
/// a `debug` event; `timestamp` adds the board time in milliseconds.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub digital_read: bool,
    #[serde(default)]
    pub digital_write: bool,
    #[serde(default)]
    pub analog_read: bool,
    #[serde(default)]
    pub analog_write: bool,
    #[serde(default)]
    pub timestamp: bool,
}

impl DebugConfig {
    pub fn all() -> Self {
        Self {
            digital_read: true,
            digital_write: true,
            analog_read: true,
            analog_write: true,
            timestamp: true,
        }
    }
}

/// Sketch run loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// Stop after this many `loop` calls; run until stopped when absent.
    #[serde(default)]
    pub max_loops: Option<u64>,
    /// Pause between `loop` calls; 0 runs them back to back.
    #[serde(default = "default_loop_delay_ms")]
    pub loop_delay_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_loops: None,
            loop_delay_ms: default_loop_delay_ms(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.board.reference_voltage > 0.0) {
            return Err(format!(
                "Reference voltage must be > 0, got {}",
                self.board.reference_voltage
            ));
        }
        if !self.serial.ignore.is_ascii() {
            return Err(format!(
                "Serial ignore character '{}' must be ASCII",
                self.serial.ignore
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_reference_voltage() -> f32 { 5.0 }
fn default_baud() -> u32 { 9600 }
fn default_ignore() -> char { '\n' }
fn default_loop_delay_ms() -> u64 { 1 }
fn default_prompt() -> String { "boardsim is requesting serial input: ".to_string() }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    let config: Config = match toml::from_str(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to parse config TOML: {}", e);
            return Err(ConfigError::Toml(e));
        }
    };
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}
