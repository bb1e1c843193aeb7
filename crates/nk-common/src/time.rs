//! Cycle counter value types and human-readable time formatting.
//!
//! A [`CycleCount`] is an opaque reading of a monotonic counter. Only the
//! difference of two readings taken in the same process means anything;
//! that difference is a [`CycleDelta`]. A [`CalibratedFrequency`] turns
//! deltas into seconds.

use serde::Serialize;
use std::ops::Sub;

/// Nanoseconds in one microsecond.
pub const NANOS_PER_MICRO: u64 = 1_000;
/// Nanoseconds in one millisecond.
pub const NANOS_PER_MILLI: u64 = 1_000_000;
/// Nanoseconds in one second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// One reading of the high-resolution counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CycleCount(pub u64);

impl CycleCount {
    /// Raw counter value.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Cycles elapsed since `earlier`.
    ///
    /// Saturates at zero if `earlier` is actually later, which can only
    /// happen when readings from different clocks are mixed.
    #[must_use]
    pub fn since(self, earlier: CycleCount) -> CycleDelta {
        CycleDelta(self.0.saturating_sub(earlier.0))
    }
}

impl Sub for CycleCount {
    type Output = CycleDelta;

    fn sub(self, rhs: CycleCount) -> CycleDelta {
        self.since(rhs)
    }
}

/// Length of a measured interval, in counter cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct CycleDelta(pub u64);

impl CycleDelta {
    /// Raw cycle count.
    #[must_use]
    pub fn cycles(self) -> u64 {
        self.0
    }
}

/// Estimated counter frequency in cycles per second.
///
/// Zero is a legal, degenerate value: it means the reference clock did not
/// advance during calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct CalibratedFrequency(pub u64);

impl CalibratedFrequency {
    /// Cycles per second.
    #[must_use]
    pub fn hz(self) -> u64 {
        self.0
    }

    /// Whether calibration failed to observe any reference ticks.
    #[must_use]
    pub fn is_degenerate(self) -> bool {
        self.0 == 0
    }

    /// Convert a cycle delta into seconds.
    ///
    /// A degenerate frequency maps a zero delta to `0.0` and anything else
    /// to `f64::INFINITY`; the result is never NaN.
    #[must_use]
    pub fn seconds(self, delta: CycleDelta) -> f64 {
        if self.0 == 0 {
            return if delta.0 == 0 { 0.0 } else { f64::INFINITY };
        }
        delta.0 as f64 / self.0 as f64
    }

    /// Convert a cycle delta into whole nanoseconds, saturating.
    #[must_use]
    pub fn nanos(self, delta: CycleDelta) -> u64 {
        if self.0 == 0 {
            return if delta.0 == 0 { 0 } else { u64::MAX };
        }
        let ns = u128::from(delta.0) * u128::from(NANOS_PER_SEC) / u128::from(self.0);
        u64::try_from(ns).unwrap_or(u64::MAX)
    }
}

/// Format a nanosecond count with the largest unit that keeps it above one.
///
/// ```
/// use nk_common::time::format_nanoseconds;
///
/// assert_eq!(format_nanoseconds(999), "999ns");
/// assert_eq!(format_nanoseconds(1_500), "1.50µs");
/// assert_eq!(format_nanoseconds(2_250_000), "2.25ms");
/// assert_eq!(format_nanoseconds(3_000_000_000), "3.00s");
/// ```
#[must_use]
pub fn format_nanoseconds(ns: u64) -> String {
    match ns {
        0..=999 => format!("{ns}ns"),
        1_000..=999_999 => format!("{:.2}µs", ns as f64 / NANOS_PER_MICRO as f64),
        1_000_000..=999_999_999 => format!("{:.2}ms", ns as f64 / NANOS_PER_MILLI as f64),
        _ => format!("{:.2}s", ns as f64 / NANOS_PER_SEC as f64),
    }
}

/// Format a frequency in Hz with an SI prefix.
///
/// ```
/// use nk_common::time::format_frequency;
///
/// assert_eq!(format_frequency(999), "999Hz");
/// assert_eq!(format_frequency(1_000_000_000), "1.00GHz");
/// ```
#[must_use]
pub fn format_frequency(hz: u64) -> String {
    match hz {
        0..=999 => format!("{hz}Hz"),
        1_000..=999_999 => format!("{:.2}KHz", hz as f64 / 1_000.0),
        1_000_000..=999_999_999 => format!("{:.2}MHz", hz as f64 / 1_000_000.0),
        _ => format!("{:.2}GHz", hz as f64 / 1_000_000_000.0),
    }
}
