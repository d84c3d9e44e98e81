// src/serial/format.rs - Number-to-text conversion for serial output
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    Bin,
    Oct,
    Dec,
    Hex,
}

/// Formats an integer in the given base. Non-decimal bases print the
/// 64-bit two's-complement pattern of negative values, lowercase, unpadded.
pub fn format_integer(value: i64, format: NumberFormat) -> String {
    let bits = value as u64;
    match format {
        NumberFormat::Bin => format!("{:b}", bits),
        NumberFormat::Oct => format!("{:o}", bits),
        NumberFormat::Dec => value.to_string(),
        NumberFormat::Hex => format!("{:x}", bits),
    }
}

/// Fixed-point rendering with `decimals` digits after the point.
pub fn format_float(value: f64, decimals: u8) -> String {
    format!("{:.*}", decimals as usize, value)
}
