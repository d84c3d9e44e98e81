//! Sketch entry points and the run loop that drives them

pub mod echo;

pub use echo::EchoSketch;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::RunnerConfig;
use crate::hardware::Board;

/// A control program: `setup` once, then `run_loop` repeatedly.
pub trait Sketch: Send {
    fn setup(&mut self, board: &Board);
    fn run_loop(&mut self, board: &Board);
}

/// Cloneable handle that asks a running [`Runner`] to return.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct Runner {
    max_loops: Option<u64>,
    loop_delay: Duration,
    stop: StopHandle,
}

impl Runner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            max_loops: config.max_loops,
            loop_delay: Duration::from_millis(config.loop_delay_ms),
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs `setup`, then `run_loop` until stopped or `max_loops` is reached.
    /// Returns the number of completed loop iterations.
    pub fn run<S: Sketch + ?Sized>(&self, board: &Board, sketch: &mut S) -> u64 {
        tracing::info!("Running sketch setup");
        sketch.setup(board);
        let mut loops = 0u64;
        while !self.stop.is_stopped() {
            if self.max_loops.is_some_and(|max| loops >= max) {
                break;
            }
            sketch.run_loop(board);
            loops += 1;
            if !self.loop_delay.is_zero() {
                std::thread::sleep(self.loop_delay);
            }
        }
        tracing::info!(loops, "Sketch stopped");
        loops
    }
}
