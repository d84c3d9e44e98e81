// src/clock.rs - Monotonic board clock and blocking delays
use std::time::{Duration, Instant};

/// Time source for everything running on a board.
///
/// `now_monotonic` is measured from power-on, so generator threads and the
/// sketch agree on the current time. The Arduino-style readings and delays
/// are provided on top of the two required methods.
pub trait TimeInterface: Send + Sync {
    /// Time elapsed since power-on.
    fn now_monotonic(&self) -> Duration;
    fn sleep(&self, duration: Duration);

    /// Milliseconds since power-on.
    fn millis(&self) -> u64 {
        self.now_monotonic().as_millis() as u64
    }

    /// Microseconds since power-on.
    fn micros(&self) -> u64 {
        self.now_monotonic().as_micros() as u64
    }

    /// Blocks the calling thread. Other threads keep running.
    fn delay(&self, milliseconds: u64) {
        self.sleep(Duration::from_millis(milliseconds));
    }

    fn delay_microseconds(&self, microseconds: u64) {
        self.sleep(Duration::from_micros(microseconds));
    }
}

/// Board clock. Elapsed time is measured from the moment the clock was
/// created, which for a [`Board`](crate::hardware::Board) is power-on.
/// Copies share the same origin.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeInterface for Clock {
    fn now_monotonic(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
