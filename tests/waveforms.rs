// Waveform generator lifecycle

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use boardsim::serial::CaptureSink;
use boardsim::{Board, Config, InterruptMode, WaveformSpec};

fn board() -> Board {
    Board::with_serial_sink(&Config::default(), Box::new(CaptureSink::new()))
}

fn change_counter(board: &Board, pin: u8) -> Arc<AtomicUsize> {
    let edges = Arc::new(AtomicUsize::new(0));
    let e = Arc::clone(&edges);
    board.attach_interrupt(
        pin,
        move || {
            e.fetch_add(1, Ordering::SeqCst);
        },
        InterruptMode::Change,
    );
    edges
}

fn wait_for_voltage(board: &Board, pin: u8, volts: f32) {
    let deadline = Instant::now() + Duration::from_secs(1);
    while board.voltage(pin) != volts {
        assert!(Instant::now() < deadline, "pin {} never reached {} V", pin, volts);
        thread::yield_now();
    }
}

#[test]
fn test_second_attach_joins_first() {
    let board = board();
    let edges = change_counter(&board, 2);
    board.attach_waveform(2, WaveformSpec::square(500.0, 0.5)).unwrap();
    thread::sleep(Duration::from_millis(10));
    assert!(edges.load(Ordering::SeqCst) > 0);

    board.attach_waveform(2, WaveformSpec::sine(0.0, 0.0, 0.0)).unwrap();
    let at_return = edges.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    // at most the replacement's first write, if the square wave was left high
    assert!(edges.load(Ordering::SeqCst) - at_return <= 1);
    assert_eq!(board.voltage(2), 0.0);
    assert_eq!(board.active_waveforms(), vec![2]);
    assert_eq!(board.waveform(2), Some(WaveformSpec::sine(0.0, 0.0, 0.0)));
    assert!(board.detach_waveform(2));
    assert!(board.active_waveforms().is_empty());
}

#[test]
fn test_concurrent_attach_never_overlaps() {
    let board = Arc::new(board());
    let edges = change_counter(&board, 5);
    for round in 0..200 {
        board.detach_waveform(5);
        board.set_voltage(5, 0.0);
        let before = edges.load(Ordering::SeqCst);

        let barrier = Arc::new(Barrier::new(2));
        let attachers: Vec<_> = [4.0, 0.5]
            .into_iter()
            .map(|level| {
                let board = Arc::clone(&board);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    board.attach_waveform(5, WaveformSpec::sine(0.0, 0.0, level)).unwrap();
                })
            })
            .collect();
        for attacher in attachers {
            attacher.join().unwrap();
        }

        assert_eq!(board.active_waveforms(), vec![5]);
        let winner = board.waveform(5).unwrap().offset as f32;
        wait_for_voltage(&board, 5, winner);
        // from 0 V: up to the high generator, then down to the low one
        let switches = edges.load(Ordering::SeqCst) - before;
        assert!(switches <= 2, "round {}: {} level switches", round, switches);
        thread::sleep(Duration::from_micros(200));
        assert_eq!(board.voltage(5), winner, "round {}", round);
    }
    board.detach_waveform(5);
}

#[test]
fn test_detach_never_attached_is_noop() {
    let board = board();
    let start = Instant::now();
    assert!(!board.detach_waveform(3));
    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!(board.voltage(3), 0.0);
}

#[test]
fn test_voltage_holds_after_detach() {
    let board = board();
    board.attach_waveform(15, WaveformSpec::sine(3.0, 1.0, 2.0)).unwrap();
    thread::sleep(Duration::from_millis(10));
    board.detach_waveform(15);
    let held = board.voltage(15);
    thread::sleep(Duration::from_millis(10));
    assert_eq!(board.voltage(15), held);
    assert!((1.0..=3.0).contains(&held));
}

#[test]
fn test_square_wave_fires_change_interrupts() {
    let board = board();
    let edges = change_counter(&board, 2);
    board.attach_waveform(2, WaveformSpec::square(100.0, 0.5)).unwrap();
    thread::sleep(Duration::from_millis(60));
    board.detach_waveform(2);
    assert!(edges.load(Ordering::SeqCst) >= 2);
}

#[test]
fn test_generators_on_different_pins_are_independent() {
    let board = board();
    board.attach_waveform(14, WaveformSpec::abs_sine(2.0, 5.0, 0.0)).unwrap();
    board.attach_waveform(15, WaveformSpec::square(5.0, 1.0)).unwrap();
    assert_eq!(board.active_waveforms(), vec![14, 15]);
    board.detach_waveform(14);
    assert_eq!(board.active_waveforms(), vec![15]);
    thread::sleep(Duration::from_millis(10));
    assert_eq!(board.voltage(15), 5.0);
}

#[test]
fn test_dropping_board_stops_generators() {
    let board = board();
    let bus = board.bus();
    board.attach_waveform(16, WaveformSpec::sine(50.0, 2.0, 2.5)).unwrap();
    thread::sleep(Duration::from_millis(5));
    drop(board);
    let held = bus.voltage(16).unwrap();
    thread::sleep(Duration::from_millis(10));
    assert_eq!(bus.voltage(16).unwrap(), held);
}
