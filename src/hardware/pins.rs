// src/hardware/pins.rs - Per-pin voltage table and level derivation
use serde::{Deserialize, Serialize};

use crate::board::{ANALOG_MAX, AREF, HIGH_THRESHOLD};

/// Digital pin configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinMode {
    Input,
    Output,
    InputPullup,
}

/// Analog reference presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogReference {
    /// 5.0 V supply rail.
    Default,
    Internal1V1,
    Internal2V56,
    /// Whatever is applied to the AREF pin; leaves the reference unchanged.
    External,
}

impl AnalogReference {
    pub fn volts(&self) -> Option<f32> {
        match self {
            AnalogReference::Default => Some(5.0),
            AnalogReference::Internal1V1 => Some(1.1),
            AnalogReference::Internal2V56 => Some(2.56),
            AnalogReference::External => None,
        }
    }
}

/// Voltage on every pin of the board plus the analog reference.
///
/// Indices are validated by the caller; out-of-range reads return 0 V and
/// out-of-range writes are dropped.
#[derive(Debug, Clone)]
pub struct VoltageStore {
    voltages: Vec<f32>,
    modes: Vec<Option<PinMode>>,
    reference: f32,
}

impl VoltageStore {
    pub fn new(max_pin: u8, reference: f32) -> Self {
        let len = max_pin as usize + 1;
        Self {
            voltages: vec![0.0; len],
            modes: vec![None; len],
            reference,
        }
    }

    pub fn voltage(&self, pin: u8) -> f32 {
        if pin == AREF {
            return self.reference;
        }
        self.voltages.get(pin as usize).copied().unwrap_or(0.0)
    }

    pub fn set_voltage(&mut self, pin: u8, volts: f32) {
        if pin == AREF {
            self.reference = volts;
        } else if let Some(slot) = self.voltages.get_mut(pin as usize) {
            *slot = volts;
        }
    }

    pub fn is_high(&self, pin: u8) -> bool {
        self.voltage(pin) > HIGH_THRESHOLD
    }

    /// Voltage rescaled from `[0, reference]` onto the 10-bit converter range.
    pub fn analog_level(&self, pin: u8) -> u16 {
        scale_to_analog(self.voltage(pin), self.reference)
    }

    pub fn reference(&self) -> f32 {
        self.reference
    }

    pub fn set_reference(&mut self, volts: f32) {
        self.reference = volts;
    }

    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.modes.get(pin as usize).copied().flatten()
    }

    pub fn set_mode(&mut self, pin: u8, mode: PinMode) {
        if let Some(slot) = self.modes.get_mut(pin as usize) {
            *slot = Some(mode);
        }
    }

    pub fn pin_count(&self) -> usize {
        self.voltages.len()
    }
}

pub fn scale_to_analog(volts: f32, reference: f32) -> u16 {
    if reference <= 0.0 {
        return if volts > 0.0 { ANALOG_MAX } else { 0 };
    }
    let max = ANALOG_MAX as f32;
    (volts / reference * max).clamp(0.0, max).round() as u16
}
