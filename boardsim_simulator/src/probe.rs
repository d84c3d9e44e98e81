//! Runs a scenario against a fresh board and samples the probed pins.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use boardsim::clock::TimeInterface;
use boardsim::config::Config;
use boardsim::hardware::{Board, InterruptMode};
use crossbeam_channel::{Sender, unbounded};

use crate::ProbeError;
use crate::recorder::{Recorder, SampleRecord};
use crate::scenario::Scenario;

/// Interrupt observed by a handler, sent to the counting thread.
#[derive(Debug, Clone, Copy)]
struct InterruptEvent {
    pin: u8,
    mode: InterruptMode,
    micros: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeSummary {
    pub samples: usize,
    pub rows: usize,
    /// Interrupt count by pin.
    pub interrupts: BTreeMap<u8, usize>,
}

pub fn run(scenario: &Scenario) -> Result<ProbeSummary, ProbeError> {
    let config = Config { board: scenario.board.clone(), ..Config::default() };
    let board = Board::with_serial_sink(&config, Box::new(std::io::sink()));
    let mut recorder = Recorder::create(&scenario.simulation.output_dir)?;

    let (event_tx, event_rx) = unbounded::<InterruptEvent>();
    let counter = std::thread::spawn(move || {
        let mut counts = BTreeMap::new();
        while let Ok(event) = event_rx.recv() {
            tracing::trace!(pin = event.pin, mode = ?event.mode, micros = event.micros, "interrupt");
            *counts.entry(event.pin).or_insert(0usize) += 1;
        }
        counts
    });

    for entry in &scenario.interrupts {
        attach_counter(&board, entry.pin, entry.mode, event_tx.clone());
    }
    drop(event_tx);

    let mut started = Vec::new();
    for generator in &scenario.generators {
        if let Err(e) = board.attach_waveform(generator.pin, generator.spec()) {
            tracing::error!(pin = generator.pin, "failed to start generator: {}", e);
            for pin in started {
                board.detach_waveform(pin);
            }
            return Err(e.into());
        }
        started.push(generator.pin);
    }
    tracing::info!(generators = started.len(), interrupts = scenario.interrupts.len(), "scenario running");

    let duration = Duration::from_millis(scenario.simulation.duration_ms);
    let interval = Duration::from_micros(scenario.simulation.sample_interval_us);
    let start = Instant::now();
    let mut sample = 0;
    let sampled = loop {
        if start.elapsed() >= duration {
            break Ok(());
        }
        if let Err(e) = sample_pins(&board, scenario, sample, &mut recorder) {
            break Err(e);
        }
        sample += 1;
        std::thread::sleep(interval);
    };

    for pin in board.active_waveforms() {
        board.detach_waveform(pin);
    }
    for entry in &scenario.interrupts {
        board.detach_interrupt(entry.pin);
    }
    let interrupts = counter.join().unwrap_or_default();
    sampled?;

    let rows = recorder.finish()?;
    Ok(ProbeSummary { samples: sample, rows, interrupts })
}

fn attach_counter(board: &Board, pin: u8, mode: InterruptMode, tx: Sender<InterruptEvent>) {
    let clock = board.clock();
    board.attach_interrupt(
        pin,
        move || {
            let _ = tx.send(InterruptEvent { pin, mode, micros: clock.micros() });
        },
        mode,
    );
}

fn sample_pins(board: &Board, scenario: &Scenario, sample: usize, recorder: &mut Recorder) -> Result<(), ProbeError> {
    let micros = board.micros();
    for &pin in &scenario.simulation.probe_pins {
        recorder.record(&SampleRecord {
            sample,
            micros,
            pin,
            voltage: board.voltage(pin),
            high: board.digital_read(pin),
            analog: board.analog_read(pin),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{GeneratorEntry, InterruptEntry, ShapeKind, SimulationConfig};
    use boardsim::config::BoardConfig;

    fn scenario(output_dir: &std::path::Path) -> Scenario {
        Scenario {
            simulation: SimulationConfig {
                duration_ms: 120,
                sample_interval_us: 2000,
                output_dir: output_dir.to_path_buf(),
                probe_pins: vec![2, 14],
            },
            board: BoardConfig::default(),
            generators: vec![
                GeneratorEntry { pin: 2, shape: ShapeKind::Square, hz: 50.0, amplitude: 0.0, offset: 0.0, duty: None },
                GeneratorEntry { pin: 14, shape: ShapeKind::Sine, hz: 5.0, amplitude: 2.0, offset: 2.5, duty: None },
            ],
            interrupts: vec![InterruptEntry { pin: 2, mode: InterruptMode::Change }],
        }
    }

    #[test]
    fn test_square_wave_drives_interrupts() {
        let dir = tempfile::tempdir().unwrap();
        let summary = run(&scenario(dir.path())).unwrap();
        assert!(summary.samples > 0);
        assert_eq!(summary.rows, summary.samples * 2);
        assert!(summary.interrupts.get(&2).copied().unwrap_or(0) >= 2);
        assert!(dir.path().join("samples.csv").exists());
        assert!(dir.path().join("samples.jsonl").exists());
    }

    #[test]
    fn test_sine_samples_stay_in_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut scenario = scenario(dir.path());
        scenario.interrupts.clear();
        scenario.simulation.probe_pins = vec![14];
        run(&scenario).unwrap();

        // A sample may land before the generator's first write, while the pin is still at 0 V.
        let mut reader = csv::Reader::from_path(dir.path().join("samples.csv")).unwrap();
        let mut driven = 0;
        for row in reader.records() {
            let row = row.unwrap();
            let volts: f32 = row[3].parse().unwrap();
            if volts == 0.0 {
                continue;
            }
            assert!((0.49..=4.51).contains(&volts), "voltage {} out of range", volts);
            driven += 1;
        }
        assert!(driven > 0);
    }
}
