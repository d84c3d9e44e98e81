//! Echo sketch: prints every received byte on its own line

use crate::hardware::Board;
use crate::sketch::Sketch;

#[derive(Debug, Clone)]
pub struct EchoSketch {
    baud: u32,
}

impl EchoSketch {
    pub fn new(baud: u32) -> Self {
        Self { baud }
    }
}

impl Default for EchoSketch {
    fn default() -> Self {
        Self::new(9600)
    }
}

impl Sketch for EchoSketch {
    fn setup(&mut self, board: &Board) {
        board.serial().begin(self.baud);
    }

    fn run_loop(&mut self, board: &Board) {
        let serial = board.serial();
        while serial.available() > 0 {
            serial.println(serial.read() as char);
        }
    }
}
