//! Receive buffer and lookahead tokenizer
//!
//! Every operation is total over whatever is buffered right now: nothing
//! waits for more input, and a miss is reported as 0, 0.0, an empty string
//! or `false`. Callers poll [`StreamBuffer::available`] when they expect more.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// How numeric parsing treats bytes in front of a number.
///
/// `SkipWhitespace` only skips the ignore byte, same as `SkipNone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookaheadMode {
    /// Discard everything up to the first numeric-looking byte.
    #[default]
    SkipAll,
    /// Give up at the first byte that cannot start a number.
    SkipNone,
    SkipWhitespace,
}

/// Byte skipped by default during numeric lookahead.
pub const DEFAULT_IGNORE: u8 = b'\n';

#[derive(Debug, Clone, Default)]
pub struct StreamBuffer {
    bytes: VecDeque<u8>,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes at the back.
    pub fn append(&mut self, data: &[u8]) {
        self.bytes.extend(data);
    }

    pub fn available(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// First byte, or 0 when empty.
    pub fn peek(&self) -> u8 {
        self.bytes.front().copied().unwrap_or(0)
    }

    /// Consumes the first byte, or returns 0 when empty.
    pub fn read(&mut self) -> u8 {
        self.bytes.pop_front().unwrap_or(0)
    }

    /// Consumes up to `length` bytes.
    pub fn read_bytes(&mut self, length: usize) -> Vec<u8> {
        let n = length.min(self.bytes.len());
        self.bytes.drain(..n).collect()
    }

    /// Consumes up to `length` bytes, stopping at `terminator`. The
    /// terminator is consumed but not returned.
    pub fn read_bytes_until(&mut self, terminator: u8, length: usize) -> Vec<u8> {
        let mut out = Vec::new();
        while out.len() < length {
            match self.bytes.pop_front() {
                Some(b) if b == terminator => break,
                Some(b) => out.push(b),
                None => break,
            }
        }
        out
    }

    /// Drops everything in front of the first occurrence of `target`,
    /// leaving the match at the front. Clears the buffer when not found.
    pub fn find(&mut self, target: &[u8]) -> bool {
        match self.position(target) {
            Some(pos) => {
                self.bytes.drain(..pos);
                true
            }
            None => {
                self.bytes.clear();
                false
            }
        }
    }

    /// `find(target)` followed by `find(terminator)`; reports only whether
    /// the target was found.
    pub fn find_until(&mut self, target: &[u8], terminator: &[u8]) -> bool {
        let found = self.find(target);
        self.find(terminator);
        found
    }

    fn position(&mut self, target: &[u8]) -> Option<usize> {
        if target.is_empty() {
            return Some(0);
        }
        self.bytes
            .make_contiguous()
            .windows(target.len())
            .position(|window| window == target)
    }

    /// Returns and clears the whole buffer.
    pub fn read_string(&mut self) -> String {
        let bytes: Vec<u8> = self.bytes.drain(..).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Returns everything before the first `terminator`, which stays
    /// buffered. Without a terminator this is [`read_string`](Self::read_string).
    pub fn read_string_until(&mut self, terminator: u8) -> String {
        match self.bytes.iter().position(|&b| b == terminator) {
            Some(pos) => {
                let bytes: Vec<u8> = self.bytes.drain(..pos).collect();
                String::from_utf8_lossy(&bytes).into_owned()
            }
            None => self.read_string(),
        }
    }

    /// Skips the ignore byte (and, under `SkipAll`, any other junk) until
    /// the front byte can start a number. Returns `false` on a miss.
    fn look_ahead(&mut self, mode: LookaheadMode, ignore: u8, allow_decimal: bool) -> bool {
        while let Some(&b) = self.bytes.front() {
            if b == ignore {
                self.bytes.pop_front();
                continue;
            }
            if starts_number(b, allow_decimal) {
                return true;
            }
            match mode {
                LookaheadMode::SkipAll => {
                    self.bytes.pop_front();
                }
                LookaheadMode::SkipNone | LookaheadMode::SkipWhitespace => return false,
            }
        }
        false
    }

    /// Length of the numeric prefix: an optional leading `-`, digits and,
    /// when `allow_decimal`, at most one `.`.
    fn numeric_prefix_len(&self, allow_decimal: bool) -> usize {
        let mut seen_point = false;
        let mut len = 0;
        for (i, &b) in self.bytes.iter().enumerate() {
            let accepted = match b {
                b'-' => i == 0,
                b'0'..=b'9' => true,
                b'.' if allow_decimal && !seen_point => {
                    seen_point = true;
                    true
                }
                _ => false,
            };
            if !accepted {
                break;
            }
            len += 1;
        }
        len
    }

    /// Next integer in the buffer, or 0 when none is found.
    pub fn parse_int(&mut self, mode: LookaheadMode, ignore: u8) -> i64 {
        if !self.look_ahead(mode, ignore, false) {
            return 0;
        }
        let len = self.numeric_prefix_len(false);
        let prefix: Vec<u8> = self.bytes.drain(..len).collect();
        let (negative, digits) = match prefix.split_first() {
            Some((b'-', rest)) => (true, rest),
            _ => (false, &prefix[..]),
        };
        let magnitude = digits
            .iter()
            .fold(0i64, |acc, d| acc.wrapping_mul(10).wrapping_add(i64::from(d - b'0')));
        if negative { magnitude.wrapping_neg() } else { magnitude }
    }

    /// Next decimal number in the buffer, or 0.0 when none is found.
    pub fn parse_float(&mut self, mode: LookaheadMode, ignore: u8) -> f32 {
        if !self.look_ahead(mode, ignore, true) {
            return 0.0;
        }
        let len = self.numeric_prefix_len(true);
        let prefix: Vec<u8> = self.bytes.drain(..len).collect();
        if !prefix.iter().any(u8::is_ascii_digit) {
            return 0.0;
        }
        // The prefix is ASCII by construction.
        std::str::from_utf8(&prefix)
            .ok()
            .and_then(|s| s.parse::<f32>().ok())
            .unwrap_or(0.0)
    }

    /// Buffered bytes without consuming them.
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

fn starts_number(b: u8, allow_decimal: bool) -> bool {
    b == b'-' || b.is_ascii_digit() || (allow_decimal && b == b'.')
}
