//! Timer acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - Calibration against the wall clock yields the counter's real rate
//! - Back-to-back reads are non-negative and near zero
//! - A zero calibration window does not spin and reports zero

use nk_common::config::TimerConfig;
use nk_common::time::CycleDelta;
use nk_runtime::{entry, estimate_frequency, CycleTimer};
use std::time::{Duration, Instant};

#[test]
fn test_zero_window() {
    let started = Instant::now();
    let freq = estimate_frequency(0);
    assert!(freq.is_degenerate());
    assert!(started.elapsed() < Duration::from_millis(50));

    let timer = CycleTimer::from_frequency(freq.hz());
    assert_eq!(timer.cycles_to_seconds(CycleDelta(0)), 0.0);
    assert!(timer.cycles_to_seconds(CycleDelta(10)).is_infinite());
}

#[test]
fn test_calibration_tracks_wall_clock() {
    let timer = CycleTimer::calibrate(&TimerConfig {
        calibration_window: Duration::from_millis(20),
    });

    let wall = Instant::now();
    let (_, delta) = timer.time(|| std::thread::sleep(Duration::from_millis(30)));
    let measured = timer.to_duration(delta);
    let actual = wall.elapsed();

    assert!(measured >= Duration::from_millis(25), "measured {measured:?}");
    assert!(measured <= actual + Duration::from_millis(20), "measured {measured:?} actual {actual:?}");
}

#[test]
fn test_entry_timer_converts_after_initialize() {
    let timer = entry::initialize_with(&TimerConfig {
        calibration_window: Duration::from_millis(5),
    });
    assert!(!timer.frequency().is_degenerate());

    let start = entry::read_cycle_counter();
    let end = entry::read_cycle_counter();
    let seconds = entry::cycles_to_seconds(end.saturating_sub(start)).unwrap();
    assert!(seconds >= 0.0);
    assert!(seconds < 0.01);
}
