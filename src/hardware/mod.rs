// src/hardware/mod.rs - Simulated board: pins, interrupts, generators, serial
pub mod bus;
pub mod interrupt;
pub mod pins;
pub mod waveform;

pub use bus::PinBus;
pub use interrupt::{InterruptHandler, InterruptMode};
pub use pins::{AnalogReference, PinMode, VoltageStore};
pub use waveform::{Waveform, WaveformBank, WaveformSpec};

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::board::{BoardModel, LOGIC_HIGH_VOLTS, PWM_MAX};
use crate::clock::{Clock, TimeInterface};
use crate::config::{Config, DebugConfig};
use crate::error::{SimError, fatal};
use crate::random::Random;
use crate::serial::SerialPort;

/// The simulated board a sketch runs against.
///
/// Owns every piece of simulator state, so two boards in one process are
/// fully independent. Entry points mirror the platform API; an undefined pin
/// terminates the process (see [`fatal`]). The fallible equivalents live on
/// [`PinBus`], reachable through [`Board::bus`].
///
/// Dropping the board stops and joins all waveform generators.
pub struct Board {
    model: BoardModel,
    bus: Arc<PinBus>,
    waveforms: WaveformBank,
    serial: SerialPort,
    clock: Clock,
    rng: Mutex<Random>,
    debug: DebugConfig,
}

impl Board {
    /// Board with serial output on stdout.
    pub fn new(config: &Config) -> Self {
        Self::with_serial(config, SerialPort::new(&config.serial))
    }

    pub fn with_serial_sink(config: &Config, sink: Box<dyn Write + Send>) -> Self {
        Self::with_serial(config, SerialPort::with_sink(&config.serial, sink))
    }

    fn with_serial(config: &Config, serial: SerialPort) -> Self {
        let model = config.board.model;
        tracing::info!(
            "Powering up {} ({} pins, {} V reference)",
            model.name(),
            model.max_pin() as u16 + 1,
            config.board.reference_voltage
        );
        Self {
            model,
            bus: Arc::new(PinBus::new(model.max_pin(), config.board.reference_voltage)),
            waveforms: WaveformBank::new(),
            serial,
            clock: Clock::new(),
            rng: Mutex::new(Random::new()),
            debug: config.debug,
        }
    }

    pub fn model(&self) -> BoardModel {
        self.model
    }

    /// Shared pin bus, e.g. for interrupt handlers that drive other pins.
    pub fn bus(&self) -> Arc<PinBus> {
        Arc::clone(&self.bus)
    }

    pub fn serial(&self) -> &SerialPort {
        &self.serial
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    fn checked<T>(&self, result: Result<T, SimError>) -> T {
        result.unwrap_or_else(|e| fatal(&e))
    }

    fn trace(&self, enabled: bool, pin: u8, what: &str, value: f64) {
        if !enabled {
            return;
        }
        if self.debug.timestamp {
            tracing::debug!(millis = self.clock.millis(), pin, value, "{}", what);
        } else {
            tracing::debug!(pin, value, "{}", what);
        }
    }

    // --- Voltage ---

    /// Drives `pin` to `volts`, dispatching interrupts. Writing
    /// [`AREF`](crate::board::AREF) changes the analog reference.
    pub fn set_voltage(&self, pin: u8, volts: f32) {
        self.checked(self.bus.set_voltage(pin, volts));
    }

    pub fn voltage(&self, pin: u8) -> f32 {
        self.checked(self.bus.voltage(pin))
    }

    /// Prompts for a voltage and applies it to `pin`.
    pub fn request_voltage<R: BufRead>(&self, pin: u8, reader: &mut R) -> Result<f32, SimError> {
        self.checked(self.bus.check_pin(pin));
        self.serial.print(format!("set voltage of pin {} to: ", pin));
        self.serial.flush();
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let volts: f32 = line
            .trim()
            .parse()
            .map_err(|_| SimError::InvalidVoltage(line.trim().to_string()))?;
        self.set_voltage(pin, volts);
        Ok(volts)
    }

    // --- Digital I/O ---

    pub fn pin_mode(&self, pin: u8, mode: PinMode) {
        self.checked(self.bus.set_mode(pin, mode));
    }

    pub fn digital_read(&self, pin: u8) -> bool {
        let level = self.checked(self.bus.digital_level(pin));
        self.trace(self.debug.digital_read, pin, "digital read", if level { 1.0 } else { 0.0 });
        level
    }

    pub fn digital_write(&self, pin: u8, level: bool) {
        self.set_voltage(pin, if level { LOGIC_HIGH_VOLTS } else { 0.0 });
        self.trace(self.debug.digital_write, pin, "digital write", if level { 1.0 } else { 0.0 });
    }

    // --- Analog I/O ---

    /// Pin voltage scaled against the reference onto `0..=1023`.
    pub fn analog_read(&self, pin: u8) -> u16 {
        let level = self.checked(self.bus.analog_level(pin));
        self.trace(self.debug.analog_read, pin, "analog read", level as f64);
        level
    }

    /// PWM output approximated as its average voltage; `duty` is clamped to `0..=255`.
    pub fn analog_write(&self, pin: u8, duty: i32) {
        let duty = duty.clamp(0, PWM_MAX);
        self.set_voltage(pin, duty as f32 / PWM_MAX as f32 * LOGIC_HIGH_VOLTS);
        self.trace(self.debug.analog_write, pin, "analog write", duty as f64);
    }

    pub fn analog_reference(&self, reference: AnalogReference) {
        if let Some(volts) = reference.volts() {
            self.bus.set_reference(volts);
        }
    }

    pub fn reference_voltage(&self) -> f32 {
        self.bus.reference()
    }

    // --- Interrupts ---

    /// Interrupt numbers are pin numbers on the simulated board.
    pub fn digital_pin_to_interrupt(&self, pin: u8) -> u8 {
        pin
    }

    /// Registers `handler` for `mode` transitions on `pin`, replacing any
    /// existing registration. The handler runs on the thread that changed
    /// the voltage, which may be a waveform generator's.
    pub fn attach_interrupt<F>(&self, pin: u8, handler: F, mode: InterruptMode)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.checked(self.bus.attach_interrupt(pin, Arc::new(handler), mode));
    }

    pub fn detach_interrupt(&self, pin: u8) {
        self.bus.detach_interrupt(pin);
    }

    pub fn interrupts(&self) {
        self.bus.set_interrupts_enabled(true);
    }

    pub fn no_interrupts(&self) {
        self.bus.set_interrupts_enabled(false);
    }

    // --- Waveform generators ---

    /// Starts a generator on `pin`, replacing (and joining) any running one.
    pub fn attach_waveform(&self, pin: u8, spec: WaveformSpec) -> Result<(), SimError> {
        match self.waveforms.attach(&self.bus, self.clock, pin, spec) {
            Err(e @ SimError::PinNotDefined { .. }) => fatal(&e),
            other => other,
        }
    }

    /// Stops the generator on `pin`. No-op when none is running.
    pub fn detach_waveform(&self, pin: u8) -> bool {
        self.waveforms.detach(pin)
    }

    pub fn waveform(&self, pin: u8) -> Option<WaveformSpec> {
        self.waveforms.spec(pin)
    }

    pub fn active_waveforms(&self) -> Vec<u8> {
        self.waveforms.active_pins()
    }

    // --- Time ---

    pub fn millis(&self) -> u64 {
        self.clock.millis()
    }

    pub fn micros(&self) -> u64 {
        self.clock.micros()
    }

    pub fn delay(&self, milliseconds: u64) {
        self.clock.delay(milliseconds);
    }

    pub fn delay_microseconds(&self, microseconds: u64) {
        self.clock.delay_microseconds(microseconds);
    }

    // --- Random numbers ---

    pub fn random(&self, max: i64) -> i64 {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).random(max)
    }

    pub fn random_range(&self, min: i64, max: i64) -> i64 {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).random_range(min, max)
    }

    pub fn random_seed(&self, seed: u64) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).random_seed(seed);
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("model", &self.model)
            .field("reference", &self.bus.reference())
            .field("waveforms", &self.waveforms.active_pins())
            .finish()
    }
}
