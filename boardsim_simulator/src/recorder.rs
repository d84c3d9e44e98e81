// Sample output: one CSV row and one JSON line per probed pin per tick
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::Writer;
use serde::Serialize;

use crate::ProbeError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    pub sample: usize,
    pub micros: u64,
    pub pin: u8,
    pub voltage: f32,
    pub high: bool,
    pub analog: u16,
}

pub struct Recorder {
    csv: Writer<File>,
    jsonl: BufWriter<File>,
    rows: usize,
}

impl Recorder {
    /// Creates `samples.csv` and `samples.jsonl` inside `output_dir`.
    pub fn create(output_dir: &Path) -> Result<Self, ProbeError> {
        std::fs::create_dir_all(output_dir)?;
        let mut csv = Writer::from_path(output_dir.join("samples.csv"))?;
        csv.write_record(["sample", "micros", "pin", "voltage", "high", "analog"])?;
        let jsonl = BufWriter::new(File::create(output_dir.join("samples.jsonl"))?);
        Ok(Self { csv, jsonl, rows: 0 })
    }

    pub fn record(&mut self, record: &SampleRecord) -> Result<(), ProbeError> {
        self.csv.write_record(&[
            record.sample.to_string(),
            record.micros.to_string(),
            record.pin.to_string(),
            record.voltage.to_string(),
            record.high.to_string(),
            record.analog.to_string(),
        ])?;
        writeln!(self.jsonl, "{}", serde_json::to_string(record)?)?;
        self.rows += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize, ProbeError> {
        self.csv.flush()?;
        self.jsonl.flush()?;
        Ok(self.rows)
    }
}
