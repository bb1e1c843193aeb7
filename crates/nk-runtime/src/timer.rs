//! High-resolution cycle timer and frequency calibration.
//!
//! The cycle counter is `CLOCK_MONOTONIC` read through `clock_gettime`. Its
//! frequency is not assumed: it is estimated by busy-waiting against the
//! wall clock (`gettimeofday`, microsecond ticks) for a calibration window
//! and comparing how far both advanced.
//!
//! [`CycleTimer`] holds the estimate. It is built once by
//! [`CycleTimer::calibrate`] and passed by reference wherever deltas are
//! converted to time.

use nk_common::config::TimerConfig;
use nk_common::time::{format_frequency, CalibratedFrequency, CycleCount, CycleDelta};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ticks per second of the OS reference timer ([`read_os_timer`]).
pub const OS_TIMER_FREQ: u64 = 1_000_000;

/// Read the high-resolution counter.
///
/// Only differences between readings are meaningful.
#[cfg(unix)]
#[must_use]
pub fn read_cycle_counter() -> CycleCount {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid out-pointer and CLOCK_MONOTONIC always exists
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return CycleCount(0);
    }
    let secs = u64::try_from(ts.tv_sec).unwrap_or(0);
    let nanos = u64::try_from(ts.tv_nsec).unwrap_or(0);
    CycleCount(secs.saturating_mul(1_000_000_000).saturating_add(nanos))
}

/// Read the high-resolution counter.
///
/// Only differences between readings are meaningful.
#[cfg(not(unix))]
#[must_use]
pub fn read_cycle_counter() -> CycleCount {
    use std::sync::OnceLock;
    use std::time::Instant;

    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    let anchor = ANCHOR.get_or_init(Instant::now);
    CycleCount(u64::try_from(anchor.elapsed().as_nanos()).unwrap_or(u64::MAX))
}

/// Read the OS reference timer in microseconds since the epoch.
#[cfg(unix)]
#[must_use]
pub fn read_os_timer() -> u64 {
    let mut tv = libc::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    // SAFETY: `tv` is a valid out-pointer; a null timezone is permitted
    let rc = unsafe { libc::gettimeofday(&mut tv, std::ptr::null_mut()) };
    if rc != 0 {
        return 0;
    }
    let secs = u64::try_from(tv.tv_sec).unwrap_or(0);
    let micros = u64::try_from(tv.tv_usec).unwrap_or(0);
    secs.saturating_mul(OS_TIMER_FREQ).saturating_add(micros)
}

/// Read the OS reference timer in microseconds since the epoch.
#[cfg(not(unix))]
#[must_use]
pub fn read_os_timer() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
}

/// Estimate the cycle counter frequency by busy-waiting `wait_ms`.
///
/// Returns zero when the OS timer did not advance, which includes
/// `wait_ms == 0`.
#[must_use]
pub fn estimate_frequency(wait_ms: u64) -> CalibratedFrequency {
    estimate_frequency_with(
        || read_cycle_counter().raw(),
        read_os_timer,
        OS_TIMER_FREQ,
        wait_ms,
    )
}

/// Frequency estimation over arbitrary clocks.
///
/// `high_res` is the counter being calibrated and `os_timer` the reference
/// ticking at `os_freq`. The loop spins until the reference has advanced
/// `os_freq * wait_ms / 1000` ticks. A reference clock stepping backwards
/// ends the wait at once and yields zero.
pub fn estimate_frequency_with<H, O>(
    mut high_res: H,
    mut os_timer: O,
    os_freq: u64,
    wait_ms: u64,
) -> CalibratedFrequency
where
    H: FnMut() -> u64,
    O: FnMut() -> u64,
{
    let wait_ticks = u128::from(os_freq) * u128::from(wait_ms) / 1_000;

    let hr_start = high_res();
    let os_start = os_timer();
    let mut os_elapsed = 0u64;
    while u128::from(os_elapsed) < wait_ticks {
        std::hint::spin_loop();
        let os_now = os_timer();
        if os_now < os_start {
            warn!(os_start, os_now, "Reference timer stepped backwards during calibration");
            return CalibratedFrequency(0);
        }
        os_elapsed = os_now - os_start;
    }
    let hr_elapsed = high_res().saturating_sub(hr_start);

    if os_elapsed == 0 {
        return CalibratedFrequency(0);
    }
    let hz = u128::from(os_freq) * u128::from(hr_elapsed) / u128::from(os_elapsed);
    CalibratedFrequency(u64::try_from(hz).unwrap_or(u64::MAX))
}

/// A calibrated cycle counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTimer {
    frequency: CalibratedFrequency,
    window: Duration,
}

impl CycleTimer {
    /// Calibrate against the OS timer for the configured window.
    #[must_use]
    pub fn calibrate(config: &TimerConfig) -> Self {
        let window_ms = config.window_ms();
        debug!(window_ms, "Calibrating cycle counter");
        let frequency = estimate_frequency(window_ms);

        if frequency.is_degenerate() {
            warn!(
                window_ms,
                "Reference timer did not advance during calibration; \
                 cycle conversions will be degenerate"
            );
        } else {
            info!(
                frequency = %format_frequency(frequency.hz()),
                window_ms,
                "Cycle counter calibrated"
            );
        }

        Self {
            frequency,
            window: config.calibration_window,
        }
    }

    /// Timer with a known frequency, skipping calibration.
    #[must_use]
    pub fn from_frequency(hz: u64) -> Self {
        Self {
            frequency: CalibratedFrequency(hz),
            window: Duration::ZERO,
        }
    }

    /// The estimated frequency.
    #[must_use]
    pub fn frequency(&self) -> CalibratedFrequency {
        self.frequency
    }

    /// Calibration window used, zero when the frequency was supplied.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Read the counter.
    #[must_use]
    pub fn now(&self) -> CycleCount {
        read_cycle_counter()
    }

    /// Seconds spanned by `delta`.
    #[must_use]
    pub fn cycles_to_seconds(&self, delta: CycleDelta) -> f64 {
        self.frequency.seconds(delta)
    }

    /// Whole nanoseconds spanned by `delta`.
    #[must_use]
    pub fn nanos(&self, delta: CycleDelta) -> u64 {
        self.frequency.nanos(delta)
    }

    /// `delta` as a [`Duration`], saturating.
    #[must_use]
    pub fn to_duration(&self, delta: CycleDelta) -> Duration {
        Duration::from_nanos(self.nanos(delta))
    }

    /// Run `work` and measure it in cycles.
    pub fn time<R>(&self, work: impl FnOnce() -> R) -> (R, CycleDelta) {
        let start = read_cycle_counter();
        let result = work();
        let end = read_cycle_counter();
        (result, end - start)
    }
}
