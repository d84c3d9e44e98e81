// Benchmark for serial stream parsing and the interrupt dispatch path
// Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use boardsim::serial::{CaptureSink, DEFAULT_IGNORE, LookaheadMode, StreamBuffer};
use boardsim::{Board, Config, InterruptMode};

fn bench_parse_int(c: &mut Criterion) {
    let mut input = String::new();
    for i in 0..10_000 {
        input.push_str(&format!("x={},y={};\n", i, -i));
    }
    c.bench_function("parse_int 20k values", |b| {
        b.iter(|| {
            let mut buffer = StreamBuffer::new();
            buffer.append(input.as_bytes());
            let mut count = 0;
            while !buffer.is_empty() {
                buffer.parse_int(LookaheadMode::SkipAll, DEFAULT_IGNORE);
                count += 1;
            }
            assert!(count >= 20_000);
        });
    });
}

fn bench_parse_float(c: &mut Criterion) {
    let input = (0..10_000).map(|i| format!("{}.{:03} ", i, i % 1000)).collect::<String>();
    c.bench_function("parse_float 10k values", |b| {
        b.iter(|| {
            let mut buffer = StreamBuffer::new();
            buffer.append(input.as_bytes());
            let mut sum = 0.0f64;
            for _ in 0..10_000 {
                sum += buffer.parse_float(LookaheadMode::SkipAll, DEFAULT_IGNORE) as f64;
            }
            assert!(sum > 0.0);
        });
    });
}

fn bench_toggle_with_interrupt(c: &mut Criterion) {
    let board = Board::with_serial_sink(&Config::default(), Box::new(CaptureSink::new()));
    board.attach_interrupt(2, || {}, InterruptMode::Change);
    c.bench_function("digital_write toggle with change interrupt", |b| {
        let mut level = false;
        b.iter(|| {
            level = !level;
            board.digital_write(2, level);
        });
    });
}

criterion_group!(benches, bench_parse_int, bench_parse_float, bench_toggle_with_interrupt);
criterion_main!(benches);
