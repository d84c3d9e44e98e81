// src/hardware/bus.rs - Voltage-set entry point shared by sketch and generators
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::board::{AREF, HIGH_THRESHOLD};
use crate::error::SimError;
use crate::hardware::interrupt::{InterruptHandler, InterruptMode, InterruptTable};
use crate::hardware::pins::{PinMode, VoltageStore};

#[derive(Debug)]
struct BusState {
    store: VoltageStore,
    interrupts: InterruptTable,
}

/// Pin voltages and interrupt registrations behind a single lock.
///
/// Every voltage change on the board goes through [`PinBus::set_voltage`],
/// whether it comes from the sketch or from a waveform thread, so both see
/// the same edge detection. The lock is never held while a handler runs.
#[derive(Debug)]
pub struct PinBus {
    max_pin: u8,
    state: Mutex<BusState>,
}

impl PinBus {
    pub fn new(max_pin: u8, reference: f32) -> Self {
        Self {
            max_pin,
            state: Mutex::new(BusState {
                store: VoltageStore::new(max_pin, reference),
                interrupts: InterruptTable::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn max_pin(&self) -> u8 {
        self.max_pin
    }

    /// Accepts `0..=max_pin` and the [`AREF`] pseudo-pin.
    pub fn check_pin(&self, pin: u8) -> Result<(), SimError> {
        if pin <= self.max_pin || pin == AREF {
            Ok(())
        } else {
            Err(SimError::PinNotDefined { pin, max: self.max_pin })
        }
    }

    /// Drives `pin` to `volts`.
    ///
    /// The matching interrupt handler, if any, runs on the calling thread
    /// before the new voltage is committed, so a handler reading the pin
    /// still observes the old value. Writing [`AREF`] changes the analog
    /// reference and never dispatches.
    pub fn set_voltage(&self, pin: u8, volts: f32) -> Result<(), SimError> {
        self.check_pin(pin)?;
        let handler = {
            let mut state = self.lock();
            if pin == AREF {
                state.store.set_reference(volts);
                return Ok(());
            }
            let before = state.store.is_high(pin);
            let after = volts > HIGH_THRESHOLD;
            state.interrupts.handler_for(pin, before, after)
        };
        if let Some(handler) = handler {
            handler();
        }
        self.lock().store.set_voltage(pin, volts);
        Ok(())
    }

    pub fn voltage(&self, pin: u8) -> Result<f32, SimError> {
        self.check_pin(pin)?;
        Ok(self.lock().store.voltage(pin))
    }

    pub fn digital_level(&self, pin: u8) -> Result<bool, SimError> {
        self.check_pin(pin)?;
        Ok(self.lock().store.is_high(pin))
    }

    pub fn analog_level(&self, pin: u8) -> Result<u16, SimError> {
        self.check_pin(pin)?;
        Ok(self.lock().store.analog_level(pin))
    }

    pub fn reference(&self) -> f32 {
        self.lock().store.reference()
    }

    pub fn set_reference(&self, volts: f32) {
        self.lock().store.set_reference(volts);
    }

    /// Records the mode. A pulled-up input floats to 5 V without dispatching.
    pub fn set_mode(&self, pin: u8, mode: PinMode) -> Result<(), SimError> {
        self.check_pin(pin)?;
        let mut state = self.lock();
        state.store.set_mode(pin, mode);
        if mode == PinMode::InputPullup {
            state.store.set_voltage(pin, crate::board::LOGIC_HIGH_VOLTS);
        }
        Ok(())
    }

    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.lock().store.mode(pin)
    }

    pub fn attach_interrupt(
        &self,
        pin: u8,
        handler: InterruptHandler,
        mode: InterruptMode,
    ) -> Result<(), SimError> {
        self.check_pin(pin)?;
        self.lock().interrupts.attach(pin, handler, mode);
        Ok(())
    }

    pub fn detach_interrupt(&self, pin: u8) -> bool {
        self.lock().interrupts.detach(pin)
    }

    pub fn interrupt_mode(&self, pin: u8) -> Option<InterruptMode> {
        self.lock().interrupts.mode(pin)
    }

    pub fn set_interrupts_enabled(&self, enabled: bool) {
        self.lock().interrupts.set_enabled(enabled);
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.lock().interrupts.is_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(bus: &PinBus, pin: u8, mode: InterruptMode) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.attach_interrupt(pin, Arc::new(move || { c.fetch_add(1, Ordering::SeqCst); }), mode)
            .unwrap();
        count
    }

    #[test]
    fn test_out_of_range_pin_rejected() {
        let bus = PinBus::new(19, 5.0);
        assert!(matches!(
            bus.set_voltage(20, 5.0),
            Err(SimError::PinNotDefined { pin: 20, max: 19 })
        ));
        assert!(bus.digital_level(200).is_err());
        assert!(bus.set_voltage(19, 5.0).is_ok());
    }

    #[test]
    fn test_reference_pin_skips_dispatch() {
        let bus = PinBus::new(19, 5.0);
        bus.set_voltage(AREF, 1.1).unwrap();
        assert_eq!(bus.reference(), 1.1);
        assert_eq!(bus.voltage(AREF).unwrap(), 1.1);
    }

    #[test]
    fn test_handler_sees_old_voltage() {
        let bus = Arc::new(PinBus::new(19, 5.0));
        let seen = Arc::new(std::sync::Mutex::new(None));
        let (b, s) = (Arc::clone(&bus), Arc::clone(&seen));
        bus.attach_interrupt(
            2,
            Arc::new(move || {
                *s.lock().unwrap() = Some(b.voltage(2).unwrap());
            }),
            InterruptMode::Rising,
        )
        .unwrap();
        bus.set_voltage(2, 5.0).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(0.0));
        assert_eq!(bus.voltage(2).unwrap(), 5.0);
    }

    #[test]
    fn test_falling_edge_counts() {
        let bus = PinBus::new(19, 5.0);
        let falling = counter(&bus, 2, InterruptMode::Falling);
        let rising = counter(&bus, 3, InterruptMode::Rising);
        let change = counter(&bus, 4, InterruptMode::Change);
        for pin in [2, 3, 4] {
            bus.set_voltage(pin, 5.0).unwrap();
            bus.set_voltage(pin, 0.0).unwrap();
            bus.set_voltage(pin, 0.0).unwrap();
        }
        assert_eq!(falling.load(Ordering::SeqCst), 1);
        assert_eq!(rising.load(Ordering::SeqCst), 1);
        assert_eq!(change.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_handler_may_write_other_pins() {
        let bus = Arc::new(PinBus::new(19, 5.0));
        let b = Arc::clone(&bus);
        bus.attach_interrupt(2, Arc::new(move || { b.set_voltage(13, 5.0).unwrap(); }), InterruptMode::Change)
            .unwrap();
        bus.set_voltage(2, 4.0).unwrap();
        assert!(bus.digital_level(13).unwrap());
    }

    #[test]
    fn test_pullup_sets_voltage_without_dispatch() {
        let bus = PinBus::new(19, 5.0);
        let change = counter(&bus, 7, InterruptMode::Change);
        bus.set_mode(7, PinMode::InputPullup).unwrap();
        assert_eq!(bus.voltage(7).unwrap(), 5.0);
        assert_eq!(bus.mode(7), Some(PinMode::InputPullup));
        assert_eq!(change.load(Ordering::SeqCst), 0);

        bus.set_mode(8, PinMode::Output).unwrap();
        assert_eq!(bus.voltage(8).unwrap(), 0.0);
    }

    #[test]
    fn test_disabled_interrupts_keep_registrations() {
        let bus = PinBus::new(19, 5.0);
        let change = counter(&bus, 2, InterruptMode::Change);
        bus.set_interrupts_enabled(false);
        bus.set_voltage(2, 5.0).unwrap();
        assert_eq!(change.load(Ordering::SeqCst), 0);
        assert_eq!(bus.interrupt_mode(2), Some(InterruptMode::Change));

        bus.set_interrupts_enabled(true);
        bus.set_voltage(2, 0.0).unwrap();
        assert_eq!(change.load(Ordering::SeqCst), 1);
    }
}
