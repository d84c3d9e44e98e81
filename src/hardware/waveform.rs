//! Background waveform generators
//!
//! Each generator owns one OS thread that keeps recomputing its pin's
//! voltage from the board clock and pushes it through [`PinBus::set_voltage`],
//! so generated signals trigger interrupts exactly like sketch writes.
//!
//! Stopping is cooperative: the thread polls a stop channel once per
//! iteration and the stopper joins it. A generator loop that stopped polling
//! would hang whoever removes it.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::board::LOGIC_HIGH_VOLTS;
use crate::clock::{Clock, TimeInterface};
use crate::error::SimError;
use crate::hardware::bus::PinBus;

/// Signal shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    /// Full-wave rectified sine.
    AbsSine,
    /// 0 V / 5 V square wave; `duty` is the high fraction in `[0, 1]`.
    Square { duty: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformSpec {
    pub hz: f64,
    pub amplitude: f64,
    pub offset: f64,
    pub shape: Waveform,
}

impl WaveformSpec {
    pub fn sine(hz: f64, amplitude: f64, offset: f64) -> Self {
        Self { hz, amplitude, offset, shape: Waveform::Sine }
    }

    pub fn abs_sine(hz: f64, amplitude: f64, offset: f64) -> Self {
        Self { hz, amplitude, offset, shape: Waveform::AbsSine }
    }

    /// Amplitude and offset do not apply to square waves.
    pub fn square(hz: f64, duty: f64) -> Self {
        Self { hz, amplitude: LOGIC_HIGH_VOLTS as f64, offset: 0.0, shape: Waveform::Square { duty } }
    }

    /// Voltage at `t` seconds.
    pub fn sample(&self, t: f64) -> f32 {
        let phase = 2.0 * PI * self.hz * t;
        match self.shape {
            Waveform::Sine => (phase.sin() * self.amplitude + self.offset) as f32,
            Waveform::AbsSine => (phase.sin() * self.amplitude + self.offset).abs() as f32,
            Waveform::Square { duty } => {
                if square_is_high(phase, duty) {
                    LOGIC_HIGH_VOLTS
                } else {
                    0.0
                }
            }
        }
    }
}

/// Triangle wave in `[0, 1]` derived from the sine phase.
pub fn triangle(phase: f64) -> f64 {
    phase.sin().acos() / PI
}

pub fn square_is_high(phase: f64, duty: f64) -> bool {
    triangle(phase) <= duty
}

/// Running generator: stop channel plus the thread to join.
#[derive(Debug)]
pub struct WaveformHandle {
    pin: u8,
    spec: WaveformSpec,
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

/// Start-up side of a freshly spawned generator. The thread writes nothing
/// until it has been handed the generator it replaces (if any), has joined
/// it, and has reported on `ready`.
struct Startup {
    handoff: Sender<Option<WaveformHandle>>,
    ready: Receiver<()>,
}

impl WaveformHandle {
    fn spawn(bus: Arc<PinBus>, clock: Clock, pin: u8, spec: WaveformSpec) -> Result<(Self, Startup), SimError> {
        let (stop, stop_rx) = crossbeam_channel::bounded(1);
        let (handoff, handoff_rx) = crossbeam_channel::bounded::<Option<WaveformHandle>>(1);
        let (ready_tx, ready) = crossbeam_channel::bounded(1);
        let thread = thread::Builder::new()
            .name(format!("waveform-{}", pin))
            .spawn(move || {
                let Ok(predecessor) = handoff_rx.recv() else {
                    return;
                };
                if let Some(predecessor) = predecessor {
                    predecessor.cancel_and_join();
                }
                let _ = ready_tx.send(());
                run_generator(&bus, clock, pin, spec, &stop_rx);
            })
            .map_err(|source| SimError::Spawn { pin, source })?;
        tracing::debug!(pin, ?spec, "waveform generator started");
        Ok((Self { pin, spec, stop, thread }, Startup { handoff, ready }))
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn spec(&self) -> WaveformSpec {
        self.spec
    }

    fn is_current_thread(&self) -> bool {
        self.thread.thread().id() == thread::current().id()
    }

    /// Signals the thread and waits until it has returned.
    ///
    /// Called from the generator's own thread (an interrupt handler running
    /// there), the thread is only signalled: it exits after the handler
    /// returns.
    pub fn cancel_and_join(self) {
        let _ = self.stop.send(());
        if self.is_current_thread() {
            tracing::warn!(pin = self.pin, "waveform generator stopped from its own thread, not joined");
            return;
        }
        if self.thread.join().is_err() {
            tracing::error!(pin = self.pin, "waveform generator thread panicked");
        }
        tracing::debug!(pin = self.pin, "waveform generator stopped");
    }
}

fn run_generator(bus: &PinBus, clock: Clock, pin: u8, spec: WaveformSpec, stop: &Receiver<()>) {
    let mut last_level: Option<bool> = None;
    loop {
        match stop.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(()) | Err(TryRecvError::Disconnected) => break,
        }
        let t = clock.now_monotonic().as_secs_f64();
        let volts = match spec.shape {
            Waveform::Square { duty } => {
                let high = square_is_high(2.0 * PI * spec.hz * t, duty);
                if last_level == Some(high) {
                    continue;
                }
                last_level = Some(high);
                if high { LOGIC_HIGH_VOLTS } else { 0.0 }
            }
            _ => spec.sample(t),
        };
        if let Err(e) = bus.set_voltage(pin, volts) {
            tracing::error!(pin, "waveform generator stopping: {}", e);
            break;
        }
    }
}

/// Generators by pin. At most one is registered per pin.
///
/// Replacement is chained: the map swap happens under the lock, and the new
/// thread joins the generator it displaced before its first write. Every
/// generator on a pin therefore runs strictly after the one before it has
/// exited, however many threads attach concurrently.
#[derive(Debug, Default)]
pub struct WaveformBank {
    handles: Mutex<HashMap<u8, WaveformHandle>>,
}

impl WaveformBank {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u8, WaveformHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a generator on `pin`, replacing any existing one. Returns once
    /// the previous thread has exited and the new one is running.
    ///
    /// When the generator being replaced is the calling thread (an interrupt
    /// handler on its own pin), this returns without waiting; the new
    /// generator starts after the handler returns.
    pub fn attach(
        &self,
        bus: &Arc<PinBus>,
        clock: Clock,
        pin: u8,
        spec: WaveformSpec,
    ) -> Result<(), SimError> {
        bus.check_pin(pin)?;
        let (handle, startup) = WaveformHandle::spawn(Arc::clone(bus), clock, pin, spec)?;
        let (wait, orphan) = {
            let mut handles = self.lock();
            let displaced = handles.insert(pin, handle);
            let wait = !displaced.as_ref().is_some_and(WaveformHandle::is_current_thread);
            let orphan = startup.handoff.send(displaced).err().and_then(|e| e.into_inner());
            (wait, orphan)
        };
        // The new thread died before taking over; stop its predecessor here.
        if let Some(orphan) = orphan {
            orphan.cancel_and_join();
        }
        if wait {
            let _ = startup.ready.recv();
        }
        Ok(())
    }

    /// Stops the generator on `pin`. Returns `false` without blocking when
    /// none was running.
    pub fn detach(&self, pin: u8) -> bool {
        let handle = self.lock().remove(&pin);
        match handle {
            Some(handle) => {
                handle.cancel_and_join();
                true
            }
            None => false,
        }
    }

    pub fn detach_all(&self) {
        let handles: Vec<WaveformHandle> = self.lock().drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.cancel_and_join();
        }
    }

    pub fn is_active(&self, pin: u8) -> bool {
        self.lock().contains_key(&pin)
    }

    pub fn spec(&self, pin: u8) -> Option<WaveformSpec> {
        self.lock().get(&pin).map(WaveformHandle::spec)
    }

    /// Pins with a running generator, ascending.
    pub fn active_pins(&self) -> Vec<u8> {
        let mut pins: Vec<u8> = self.lock().keys().copied().collect();
        pins.sort_unstable();
        pins
    }
}

impl Drop for WaveformBank {
    fn drop(&mut self) {
        self.detach_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sine_samples() {
        let spec = WaveformSpec::sine(1.0, 2.0, 2.5);
        assert!((spec.sample(0.0) - 2.5).abs() < 1e-6);
        assert!((spec.sample(0.25) - 4.5).abs() < 1e-5);
        assert!((spec.sample(0.75) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_abs_sine_never_negative() {
        let spec = WaveformSpec::abs_sine(3.0, 4.0, 0.0);
        for i in 0..100 {
            assert!(spec.sample(i as f64 / 100.0) >= 0.0);
        }
        assert!((spec.sample(1.0 / 12.0) - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_triangle_range() {
        for i in 0..=64 {
            let tri = triangle(i as f64 * PI / 16.0);
            assert!((0.0..=1.0).contains(&tri));
        }
        assert!((triangle(PI / 2.0) - 0.0).abs() < 1e-9);
        assert!((triangle(-PI / 2.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_square_duty_fraction() {
        let spec = WaveformSpec::square(1.0, 0.25);
        let samples = 10_000;
        let high = (0..samples)
            .filter(|i| spec.sample(*i as f64 / samples as f64) > 3.0)
            .count();
        let fraction = high as f64 / samples as f64;
        assert!((fraction - 0.25).abs() < 0.01, "fraction was {}", fraction);
    }

    #[test]
    fn test_detach_without_generator() {
        let bank = WaveformBank::new();
        assert!(!bank.detach(3));
        assert!(bank.active_pins().is_empty());
    }

    #[test]
    fn test_attach_drives_pin() {
        let bus = Arc::new(PinBus::new(19, 5.0));
        let bank = WaveformBank::new();
        bank.attach(&bus, Clock::new(), 9, WaveformSpec::sine(0.0, 0.0, 4.0)).unwrap();
        assert!(bank.is_active(9));
        let mut driven = false;
        for _ in 0..200 {
            if bus.voltage(9).unwrap() == 4.0 {
                driven = true;
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(driven);
        assert!(bank.detach(9));
        assert!(!bank.is_active(9));
    }

    #[test]
    fn test_attach_rejects_undefined_pin() {
        let bus = Arc::new(PinBus::new(19, 5.0));
        let bank = WaveformBank::new();
        let result = bank.attach(&bus, Clock::new(), 40, WaveformSpec::square(10.0, 0.5));
        assert!(matches!(result, Err(SimError::PinNotDefined { pin: 40, .. })));
        assert!(bank.active_pins().is_empty());
    }

    #[test]
    fn test_handler_reattaches_own_pin() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let bus = Arc::new(PinBus::new(19, 5.0));
        let bank = Arc::new(WaveformBank::new());
        let clock = Clock::new();
        let swapped = Arc::new(AtomicBool::new(false));
        let handler: crate::hardware::InterruptHandler = {
            let bus = Arc::clone(&bus);
            let bank = Arc::clone(&bank);
            let swapped = Arc::clone(&swapped);
            Arc::new(move || {
                if !swapped.swap(true, Ordering::SeqCst) {
                    bank.attach(&bus, clock, 6, WaveformSpec::sine(0.0, 0.0, 1.0)).unwrap();
                }
            })
        };
        bus.attach_interrupt(6, handler, crate::hardware::InterruptMode::Rising).unwrap();
        bank.attach(&bus, clock, 6, WaveformSpec::square(200.0, 0.5)).unwrap();

        let mut settled = false;
        for _ in 0..500 {
            if bank.spec(6) == Some(WaveformSpec::sine(0.0, 0.0, 1.0)) && bus.voltage(6).unwrap() == 1.0 {
                settled = true;
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(settled);
        assert_eq!(bank.active_pins(), vec![6]);
        assert!(bank.detach(6));
        bus.detach_interrupt(6);
    }

    #[test]
    fn test_no_writes_after_detach() {
        let bus = Arc::new(PinBus::new(19, 5.0));
        let bank = WaveformBank::new();
        bank.attach(&bus, Clock::new(), 5, WaveformSpec::sine(50.0, 1.0, 1.0)).unwrap();
        thread::sleep(Duration::from_millis(5));
        bank.detach(5);
        bus.set_voltage(5, 4.2).unwrap();
        thread::sleep(Duration::from_millis(5));
        assert_eq!(bus.voltage(5).unwrap(), 4.2);
    }
}
