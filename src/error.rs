// src/error.rs - Error types shared by the board, serial port and binaries
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("pin {pin} is not defined (board maximum is {max})")]
    PinNotDefined { pin: u8, max: u8 },
    #[error("failed to start waveform generator on pin {pin}: {source}")]
    Spawn {
        pin: u8,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid voltage input: {0}")]
    InvalidVoltage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Logs `err`, prints the board's error line to stderr and exits with status 1.
pub fn fatal(err: &SimError) -> ! {
    tracing::error!("{}", err);
    match err {
        SimError::PinNotDefined { pin, .. } => eprintln!("ERROR: PIN {} IS NOT DEFINED", pin),
        other => eprintln!("ERROR: {}", other),
    }
    std::process::exit(1)
}
