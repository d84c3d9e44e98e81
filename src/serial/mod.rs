//! Simulated serial port
//!
//! Receive side: a [`StreamBuffer`] filled by [`SerialPort::ingest`] (or the
//! async [`feed_lines`] task) and drained by the sketch. Transmit side: text
//! formatted and written to an output sink, stdout by default.

pub mod feed;
pub mod format;
pub mod stream;

pub use feed::feed_lines;
pub use format::{NumberFormat, format_float, format_integer};
pub use stream::{DEFAULT_IGNORE, LookaheadMode, StreamBuffer};

use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::SerialConfig;

/// Port configuration that the sketch can change at run time.
#[derive(Debug, Clone)]
pub struct PortSettings {
    pub baud: u32,
    pub open: bool,
    /// Stored for API compatibility; reads never wait.
    pub timeout_ms: u64,
    pub lookahead: LookaheadMode,
    pub ignore: u8,
    pub prompt: String,
}

impl From<&SerialConfig> for PortSettings {
    fn from(config: &SerialConfig) -> Self {
        Self {
            baud: config.baud,
            open: false,
            timeout_ms: 1000,
            lookahead: config.lookahead,
            ignore: config.ignore_byte(),
            prompt: config.prompt.clone(),
        }
    }
}

/// Output sink that keeps everything written to it, shareable across clones.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct SerialPort {
    rx: Mutex<StreamBuffer>,
    tx: Mutex<Box<dyn Write + Send>>,
    settings: Mutex<PortSettings>,
}

impl SerialPort {
    /// Port writing to stdout.
    pub fn new(config: &SerialConfig) -> Self {
        Self::with_sink(config, Box::new(io::stdout()))
    }

    pub fn with_sink(config: &SerialConfig, sink: Box<dyn Write + Send>) -> Self {
        Self {
            rx: Mutex::new(StreamBuffer::new()),
            tx: Mutex::new(sink),
            settings: Mutex::new(PortSettings::from(config)),
        }
    }

    fn rx(&self) -> MutexGuard<'_, StreamBuffer> {
        self.rx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tx(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settings(&self) -> MutexGuard<'_, PortSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Port control ---

    pub fn begin(&self, baud: u32) {
        let mut settings = self.settings();
        settings.baud = baud;
        settings.open = true;
        tracing::debug!(baud, "serial port opened");
    }

    pub fn end(&self) {
        self.settings().open = false;
    }

    pub fn is_open(&self) -> bool {
        self.settings().open
    }

    pub fn baud(&self) -> u32 {
        self.settings().baud
    }

    pub fn set_timeout(&self, timeout_ms: u64) {
        self.settings().timeout_ms = timeout_ms;
    }

    /// Default lookahead policy for [`parse_int`](Self::parse_int) and
    /// [`parse_float`](Self::parse_float).
    pub fn set_lookahead(&self, mode: LookaheadMode, ignore: u8) {
        let mut settings = self.settings();
        settings.lookahead = mode;
        settings.ignore = ignore;
    }

    pub fn flush(&self) {
        if let Err(e) = self.tx().flush() {
            tracing::warn!("serial flush failed: {}", e);
        }
    }

    pub fn available_for_write(&self) -> usize {
        usize::MAX
    }

    // --- Input ---

    /// Appends received bytes to the receive buffer.
    pub fn ingest(&self, data: &[u8]) {
        self.rx().append(data);
        tracing::trace!(bytes = data.len(), "serial input appended");
    }

    /// Prompts on the output sink, then reads one line from `reader` into
    /// the receive buffer (newline included). Returns the bytes appended.
    pub fn take_input<R: BufRead>(&self, reader: &mut R) -> io::Result<usize> {
        let prompt = self.settings().prompt.clone();
        {
            let mut tx = self.tx();
            tx.write_all(prompt.as_bytes())?;
            tx.flush()?;
        }
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        self.ingest(line.as_bytes());
        Ok(n)
    }

    pub fn available(&self) -> usize {
        self.rx().available()
    }

    pub fn peek(&self) -> u8 {
        self.rx().peek()
    }

    pub fn read(&self) -> u8 {
        self.rx().read()
    }

    pub fn read_bytes(&self, length: usize) -> Vec<u8> {
        self.rx().read_bytes(length)
    }

    pub fn read_bytes_until(&self, terminator: u8, length: usize) -> Vec<u8> {
        self.rx().read_bytes_until(terminator, length)
    }

    pub fn find(&self, target: impl AsRef<[u8]>) -> bool {
        self.rx().find(target.as_ref())
    }

    pub fn find_until(&self, target: impl AsRef<[u8]>, terminator: impl AsRef<[u8]>) -> bool {
        self.rx().find_until(target.as_ref(), terminator.as_ref())
    }

    pub fn parse_int(&self) -> i64 {
        let (mode, ignore) = self.lookahead();
        self.parse_int_with(mode, ignore)
    }

    pub fn parse_int_with(&self, mode: LookaheadMode, ignore: u8) -> i64 {
        self.rx().parse_int(mode, ignore)
    }

    pub fn parse_float(&self) -> f32 {
        let (mode, ignore) = self.lookahead();
        self.parse_float_with(mode, ignore)
    }

    pub fn parse_float_with(&self, mode: LookaheadMode, ignore: u8) -> f32 {
        self.rx().parse_float(mode, ignore)
    }

    pub fn read_string(&self) -> String {
        self.rx().read_string()
    }

    pub fn read_string_until(&self, terminator: u8) -> String {
        self.rx().read_string_until(terminator)
    }

    /// Buffered input, not consumed.
    pub fn pending(&self) -> Vec<u8> {
        self.rx().contents()
    }

    fn lookahead(&self) -> (LookaheadMode, u8) {
        let settings = self.settings();
        (settings.lookahead, settings.ignore)
    }

    // --- Output ---

    /// Writes raw bytes; returns how many were written.
    pub fn write(&self, data: &[u8]) -> usize {
        match self.tx().write_all(data) {
            Ok(()) => data.len(),
            Err(e) => {
                tracing::warn!("serial write failed: {}", e);
                0
            }
        }
    }

    pub fn print<T: fmt::Display>(&self, value: T) -> usize {
        self.write(value.to_string().as_bytes())
    }

    pub fn print_radix<T: Into<i64>>(&self, value: T, format: NumberFormat) -> usize {
        self.write(format_integer(value.into(), format).as_bytes())
    }

    pub fn print_float(&self, value: f64, decimals: u8) -> usize {
        self.write(format_float(value, decimals).as_bytes())
    }

    pub fn newline(&self) -> usize {
        self.write(b"\n")
    }

    pub fn println<T: fmt::Display>(&self, value: T) -> usize {
        self.print(value) + self.newline()
    }

    pub fn println_radix<T: Into<i64>>(&self, value: T, format: NumberFormat) -> usize {
        self.print_radix(value, format) + self.newline()
    }

    pub fn println_float(&self, value: f64, decimals: u8) -> usize {
        self.print_float(value, decimals) + self.newline()
    }
}

impl fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPort")
            .field("settings", &*self.settings())
            .field("available", &self.available())
            .finish()
    }
}
