//! External interrupt registrations and edge detection
//!
//! The table only decides *whether* a handler should run for a given
//! transition. Invoking it is left to the [`PinBus`](super::bus::PinBus),
//! which does so on whatever thread performed the write, after releasing
//! its lock. Handlers must therefore be safe to call from any thread,
//! including a waveform generator's.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub type InterruptHandler = Arc<dyn Fn() + Send + Sync + 'static>;

/// Digital transition that triggers a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptMode {
    Change,
    Rising,
    Falling,
}

impl InterruptMode {
    pub fn triggers(&self, before: bool, after: bool) -> bool {
        match self {
            InterruptMode::Change => before != after,
            InterruptMode::Rising => !before && after,
            InterruptMode::Falling => before && !after,
        }
    }
}

#[derive(Clone)]
pub struct Registration {
    pub handler: InterruptHandler,
    pub mode: InterruptMode,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("mode", &self.mode).finish()
    }
}

#[derive(Debug)]
pub struct InterruptTable {
    registrations: HashMap<u8, Registration>,
    enabled: bool,
}

impl InterruptTable {
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
            enabled: true,
        }
    }

    /// Replaces any previous registration for `pin`.
    pub fn attach(&mut self, pin: u8, handler: InterruptHandler, mode: InterruptMode) {
        self.registrations.insert(pin, Registration { handler, mode });
    }

    pub fn detach(&mut self, pin: u8) -> bool {
        self.registrations.remove(&pin).is_some()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mode(&self, pin: u8) -> Option<InterruptMode> {
        self.registrations.get(&pin).map(|r| r.mode)
    }

    /// Handler to run for a `before -> after` transition on `pin`, if any.
    pub fn handler_for(&self, pin: u8, before: bool, after: bool) -> Option<InterruptHandler> {
        if !self.enabled {
            return None;
        }
        self.registrations
            .get(&pin)
            .filter(|r| r.mode.triggers(before, after))
            .map(|r| Arc::clone(&r.handler))
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl Default for InterruptTable {
    fn default() -> Self {
        Self::new()
    }
}
