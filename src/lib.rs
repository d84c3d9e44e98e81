//! boardsim: an emulator of a microcontroller board's I/O subsystem.
//!
//! Sketches run against a [`Board`] that holds analog pin voltages,
//! dispatches pin-change interrupts, drives waveform generator threads and
//! exposes a serial port with stream parsing.

pub mod board;
pub mod clock;
pub mod config;
pub mod error;
pub mod hardware;
pub mod random;
pub mod serial;
pub mod sketch;

pub use board::{AREF, BoardModel, LED_BUILTIN};
pub use clock::{Clock, TimeInterface};
pub use config::{Config, ConfigError, load_config};
pub use error::SimError;
pub use hardware::{AnalogReference, Board, InterruptMode, PinMode, Waveform, WaveformSpec};
pub use serial::{LookaheadMode, NumberFormat, SerialPort};
pub use sketch::{Runner, Sketch, StopHandle};
