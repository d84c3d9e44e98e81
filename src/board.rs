//! Board profiles and pin constants for the emulated boards

use serde::{Deserialize, Serialize};

/// Built-in LED pin, the same on every supported board.
pub const LED_BUILTIN: u8 = 13;

/// Pseudo-pin addressing the analog reference voltage.
pub const AREF: u8 = u8::MAX;

/// Voltage above which a pin reads as HIGH. Independent of the reference.
pub const HIGH_THRESHOLD: f32 = 3.0;

/// Voltage driven by a HIGH digital write or a pulled-up input.
pub const LOGIC_HIGH_VOLTS: f32 = 5.0;

/// Largest value returned by an analog read (10-bit converter).
pub const ANALOG_MAX: u16 = 1023;

/// Largest duty cycle accepted by an analog write (8-bit PWM).
pub const PWM_MAX: i32 = 255;

/// Supported board models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardModel {
    #[default]
    Uno,
    Nano,
    Pro,
    ProMini,
}

impl BoardModel {
    /// Highest valid pin index. Pins `0..=max_pin()` exist.
    pub fn max_pin(&self) -> u8 {
        match self {
            BoardModel::Uno => 19,
            BoardModel::Nano | BoardModel::Pro | BoardModel::ProMini => 21,
        }
    }

    /// Number of analog input channels (`A0`, `A1`, ...).
    pub fn analog_inputs(&self) -> u8 {
        match self {
            BoardModel::Uno => 6,
            BoardModel::Nano | BoardModel::Pro | BoardModel::ProMini => 8,
        }
    }

    /// Digital pin index of analog channel `channel`, e.g. `analog_pin(0)` is `A0`.
    pub fn analog_pin(&self, channel: u8) -> Option<u8> {
        if channel < self.analog_inputs() {
            Some(14 + channel)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BoardModel::Uno => "Arduino Uno",
            BoardModel::Nano => "Arduino Nano",
            BoardModel::Pro => "Arduino Pro",
            BoardModel::ProMini => "Arduino Pro Mini",
        }
    }
}

impl std::str::FromStr for BoardModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "uno" => Ok(BoardModel::Uno),
            "nano" => Ok(BoardModel::Nano),
            "pro" => Ok(BoardModel::Pro),
            "pro_mini" | "promini" => Ok(BoardModel::ProMini),
            other => Err(format!("unknown board model '{}'", other)),
        }
    }
}
