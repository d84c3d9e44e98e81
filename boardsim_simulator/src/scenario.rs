//! Probe scenarios: which generators and interrupts to set up, and what to sample.
//!
//! ```toml
//! [simulation]
//! duration_ms = 200
//! sample_interval_us = 1000
//! output_dir = "./sim_output/"
//! probe_pins = [2, 14]
//!
//! [board]
//! model = "uno"
//!
//! [[generators]]
//! pin = 2
//! shape = "square"
//! hz = 50.0
//! duty = 0.25
//!
//! [[interrupts]]
//! pin = 2
//! mode = "change"
//! ```

use std::path::PathBuf;

use boardsim::config::BoardConfig;
use boardsim::hardware::{InterruptMode, WaveformSpec};
use config as config_rs;
use serde::Deserialize;

use crate::ProbeError;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub generators: Vec<GeneratorEntry>,
    #[serde(default)]
    pub interrupts: Vec<InterruptEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub duration_ms: u64,
    #[serde(default = "default_sample_interval_us")]
    pub sample_interval_us: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub probe_pins: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Sine,
    AbsSine,
    Square,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorEntry {
    pub pin: u8,
    pub shape: ShapeKind,
    pub hz: f64,
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    #[serde(default)]
    pub offset: f64,
    /// Square waves only; defaults to 0.5.
    #[serde(default)]
    pub duty: Option<f64>,
}

impl GeneratorEntry {
    pub fn spec(&self) -> WaveformSpec {
        match self.shape {
            ShapeKind::Sine => WaveformSpec::sine(self.hz, self.amplitude, self.offset),
            ShapeKind::AbsSine => WaveformSpec::abs_sine(self.hz, self.amplitude, self.offset),
            ShapeKind::Square => WaveformSpec::square(self.hz, self.duty.unwrap_or(0.5)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterruptEntry {
    pub pin: u8,
    pub mode: InterruptMode,
}

impl Scenario {
    /// Loads a scenario file through the layered `config` crate loader.
    pub fn load(path: &str) -> Result<Self, ProbeError> {
        let settings = config_rs::Config::builder()
            .add_source(config_rs::File::with_name(path))
            .build()?;
        let scenario: Scenario = settings.try_deserialize()?;
        scenario.validate().map_err(ProbeError::Invalid)?;
        Ok(scenario)
    }

    /// Every pin must exist on the board, and each pin may carry one generator.
    pub fn validate(&self) -> Result<(), String> {
        let max = self.board.model.max_pin();
        let pins = self
            .generators
            .iter()
            .map(|g| g.pin)
            .chain(self.interrupts.iter().map(|i| i.pin))
            .chain(self.simulation.probe_pins.iter().copied());
        for pin in pins {
            if pin > max {
                return Err(format!("pin {} does not exist on {} (max {})", pin, self.board.model.name(), max));
            }
        }
        for (i, generator) in self.generators.iter().enumerate() {
            if self.generators[..i].iter().any(|g| g.pin == generator.pin) {
                return Err(format!("pin {} has more than one generator", generator.pin));
            }
            if !(generator.hz > 0.0) {
                return Err(format!("generator on pin {} needs hz > 0, got {}", generator.pin, generator.hz));
            }
            if let Some(duty) = generator.duty {
                if !(0.0..=1.0).contains(&duty) {
                    return Err(format!("generator on pin {} has duty {} outside [0, 1]", generator.pin, duty));
                }
            }
        }
        if self.simulation.sample_interval_us == 0 {
            return Err("sample_interval_us must be > 0".to_string());
        }
        Ok(())
    }
}

fn default_sample_interval_us() -> u64 { 1000 }
fn default_output_dir() -> PathBuf { PathBuf::from("./sim_output/") }
fn default_amplitude() -> f64 { 2.5 }
