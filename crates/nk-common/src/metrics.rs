//! Timing statistics for repeated kernel invocations.
//!
//! A [`TimedWork`] accumulates nanosecond samples for one kernel at one
//! input size. Samples live in a fixed ring buffer so recording never
//! allocates once the collector is built.

use crate::time::format_nanoseconds;
use serde::Serialize;

/// Samples retained for percentiles by [`TimedWork::measure_until_stable`].
pub const STABLE_SAMPLE_CAPACITY: usize = 1024;

/// Sampled execution times of one piece of work.
#[derive(Debug, Clone)]
pub struct TimedWork {
    /// Ring buffer of durations in nanoseconds.
    samples: Box<[u64]>,
    /// Current write position in the ring buffer.
    write_pos: usize,
    /// Number of samples retained (saturates at buffer size).
    sample_count: usize,
    /// Total iterations recorded.
    iterations: u64,
    min_ns: u64,
    max_ns: u64,
    /// Sum of all durations for the mean.
    sum_ns: u64,
}

impl TimedWork {
    /// Create a collector retaining up to `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let size = capacity.max(1);
        Self {
            samples: vec![0u64; size].into_boxed_slice(),
            write_pos: 0,
            sample_count: 0,
            iterations: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            sum_ns: 0,
        }
    }

    /// Record one iteration's duration in nanoseconds.
    pub fn record_ns(&mut self, ns: u64) {
        self.samples[self.write_pos] = ns;
        self.write_pos = (self.write_pos + 1) % self.samples.len();
        self.sample_count = self.sample_count.saturating_add(1).min(self.samples.len());

        self.iterations += 1;
        self.min_ns = self.min_ns.min(ns);
        self.max_ns = self.max_ns.max(ns);
        self.sum_ns = self.sum_ns.saturating_add(ns);
    }

    /// Run `work` `iterations` times, recording what it reports.
    ///
    /// `work` measures itself and returns elapsed nanoseconds, so setup
    /// it does before starting its clock is excluded.
    #[must_use]
    pub fn measure<F>(iterations: u32, mut work: F) -> Self
    where
        F: FnMut() -> u64,
    {
        let mut timed = Self::new(iterations as usize);
        for _ in 0..iterations {
            timed.record_ns(work());
        }
        timed
    }

    /// Run `work` until neither min nor max has changed for `max_no_change`
    /// consecutive iterations, or `max_iterations` have run.
    ///
    /// A new min or max restarts the count, so noisy work runs longer.
    /// `max_no_change == 0` runs nothing.
    #[must_use]
    pub fn measure_until_stable<F>(max_no_change: u32, max_iterations: u32, mut work: F) -> Self
    where
        F: FnMut() -> u64,
    {
        let mut timed = Self::new(STABLE_SAMPLE_CAPACITY);
        let mut since_change = 0u32;
        while since_change < max_no_change && timed.iterations < u64::from(max_iterations) {
            let ns = work();
            let changed = timed.iterations == 0 || ns < timed.min_ns || ns > timed.max_ns;
            timed.record_ns(ns);
            since_change = if changed { 0 } else { since_change + 1 };
        }
        timed
    }

    /// Total iterations recorded.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Fastest iteration.
    #[must_use]
    pub fn min_ns(&self) -> Option<u64> {
        (self.iterations > 0).then_some(self.min_ns)
    }

    /// Slowest iteration.
    #[must_use]
    pub fn max_ns(&self) -> Option<u64> {
        (self.iterations > 0).then_some(self.max_ns)
    }

    /// Mean iteration time.
    #[must_use]
    pub fn mean_ns(&self) -> Option<u64> {
        (self.iterations > 0).then(|| self.sum_ns / self.iterations)
    }

    /// Compute a percentile over the retained samples.
    ///
    /// Returns `None` with no samples or a percentile outside `0.0..=100.0`.
    #[must_use]
    pub fn percentile(&self, percentile: f64) -> Option<u64> {
        if self.sample_count == 0 || !(0.0..=100.0).contains(&percentile) {
            return None;
        }

        let mut sorted: Vec<u64> = self.samples[..self.sample_count].to_vec();
        sorted.sort_unstable();

        let idx = ((percentile / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    /// Get a snapshot for reporting.
    #[must_use]
    pub fn snapshot(&self) -> TimedWorkSnapshot {
        TimedWorkSnapshot {
            iterations: self.iterations,
            min_ns: self.min_ns(),
            max_ns: self.max_ns(),
            mean_ns: self.mean_ns(),
            median_ns: self.percentile(50.0),
        }
    }
}

/// Immutable summary of a [`TimedWork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimedWorkSnapshot {
    /// Total iterations.
    pub iterations: u64,
    /// Fastest iteration in nanoseconds.
    pub min_ns: Option<u64>,
    /// Slowest iteration in nanoseconds.
    pub max_ns: Option<u64>,
    /// Mean iteration in nanoseconds.
    pub mean_ns: Option<u64>,
    /// Median iteration in nanoseconds.
    pub median_ns: Option<u64>,
}

impl TimedWorkSnapshot {
    /// Two-column report lines: `(label, value)` for min, max and iterations.
    #[must_use]
    pub fn report_lines(&self, title: &str) -> Vec<(String, String)> {
        let fmt = |v: Option<u64>| v.map_or_else(|| "-".to_string(), format_nanoseconds);
        vec![
            (format!("{title} (min)"), fmt(self.min_ns)),
            (format!("{title} (max)"), fmt(self.max_ns)),
            (format!("{title} (iterations)"), self.iterations.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_recording() {
        let mut work = TimedWork::new(10);
        work.record_ns(500);
        work.record_ns(600);
        work.record_ns(550);

        assert_eq!(work.iterations(), 3);
        assert_eq!(work.min_ns(), Some(500));
        assert_eq!(work.max_ns(), Some(600));
        assert_eq!(work.mean_ns(), Some(550));
    }

    #[test]
    fn test_empty_has_no_stats() {
        let work = TimedWork::new(4);
        assert!(work.min_ns().is_none());
        assert!(work.mean_ns().is_none());
        assert!(work.percentile(50.0).is_none());
        assert_eq!(work.snapshot().iterations, 0);
    }

    #[test]
    fn test_measure_runs_each_iteration() {
        let mut next = 0;
        let work = TimedWork::measure(5, || {
            next += 10;
            next
        });
        assert_eq!(work.iterations(), 5);
        assert_eq!(work.min_ns(), Some(10));
        assert_eq!(work.max_ns(), Some(50));
    }

    #[test]
    fn test_until_stable_stops_after_quiet_run() {
        let work = TimedWork::measure_until_stable(3, 1_000, || 100);
        // First sample sets min and max, then three unchanged runs
        assert_eq!(work.iterations(), 4);
        assert_eq!(work.min_ns(), Some(100));
    }

    #[test]
    fn test_until_stable_resets_on_new_extreme() {
        let samples = [100, 100, 50, 50, 50, 200, 200, 200, 200];
        let mut next = samples.iter().copied();
        let work = TimedWork::measure_until_stable(3, 1_000, || next.next().unwrap_or(150));
        // New min at index 2 and new max at index 5 each restart the count
        assert_eq!(work.iterations(), 9);
        assert_eq!(work.min_ns(), Some(50));
        assert_eq!(work.max_ns(), Some(200));
    }

    #[test]
    fn test_until_stable_respects_cap() {
        let mut next = 0;
        let work = TimedWork::measure_until_stable(5, 50, || {
            next += 1;
            next
        });
        assert_eq!(work.iterations(), 50);
    }

    #[test]
    fn test_until_stable_zero_runs_nothing() {
        let work = TimedWork::measure_until_stable(0, 10, || 1);
        assert_eq!(work.iterations(), 0);
    }

    #[test]
    fn test_percentile_calculation() {
        let mut work = TimedWork::new(100);
        for i in 1..=100 {
            work.record_ns(i);
        }

        let p50 = work.percentile(50.0).unwrap();
        assert!((49..=51).contains(&p50));
        assert!(work.percentile(-1.0).is_none());
        assert!(work.percentile(101.0).is_none());
        assert!(work.percentile(f64::NAN).is_none());
    }

    #[test]
    fn test_ring_buffer_wrapping() {
        let mut work = TimedWork::new(10);
        for i in 0..25 {
            work.record_ns(i * 1000);
        }
        assert_eq!(work.iterations(), 25);
        assert_eq!(work.min_ns(), Some(0));
        assert_eq!(work.max_ns(), Some(24_000));
        // Only the last 10 samples are retained for percentiles
        assert_eq!(work.percentile(0.0), Some(15_000));
    }

    #[test]
    fn test_report_lines() {
        let mut work = TimedWork::new(2);
        work.record_ns(1_500);
        let lines = work.snapshot().report_lines("Sum [10]");
        assert_eq!(lines[0], ("Sum [10] (min)".to_string(), "1.50µs".to_string()));
        assert_eq!(lines[2].1, "1");
    }
}
