//! Host-facing entry surface.
//!
//! Each function acquires its buffer exactly once through an RAII guard,
//! runs one kernel, and releases on return. Mutating kernels commit a
//! private copy back to the owner; read-only ones release without commit.
//!
//! The registration layer that calls these has no context to carry a
//! [`CycleTimer`], so the timing functions share one process-wide slot
//! filled by [`initialize`].

use crate::foreign::{Acquired, AcquiredChars, Chars, Elements, ForeignBuffer, ForeignString};
use crate::timer::{self, CycleTimer};
use nk_common::config::TimerConfig;
use nk_common::error::{KernelError, KernelResult};
use nk_common::time::CycleDelta;
use nk_kernels::simd::IncrementStrategy;
use std::sync::{OnceLock, PoisonError, RwLock};
use tracing::{debug, trace};

/// Constant string handed across the boundary by [`greeting`].
pub const GREETING: &str = "Hello, World!";

static TIMER: RwLock<Option<CycleTimer>> = RwLock::new(None);
static VECTOR_STRATEGY: OnceLock<IncrementStrategy> = OnceLock::new();

fn vector_strategy() -> IncrementStrategy {
    *VECTOR_STRATEGY.get_or_init(IncrementStrategy::detect)
}

/// Add 1 to every element with the scalar loop.
pub fn increment_all<B>(buffer: &B)
where
    B: ForeignBuffer<Element = i32> + ?Sized,
{
    increment_all_with(buffer, IncrementStrategy::Scalar);
}

/// Add 1 to every element with the best vector strategy for this CPU.
pub fn increment_all_vectorized<B>(buffer: &B)
where
    B: ForeignBuffer<Element = i32> + ?Sized,
{
    increment_all_with(buffer, vector_strategy());
}

/// Add 1 to every element with an explicit strategy.
pub fn increment_all_with<B>(buffer: &B, strategy: IncrementStrategy)
where
    B: ForeignBuffer<Element = i32> + ?Sized,
{
    let mut elements = Elements::acquire(buffer);
    let values = match elements.acquired() {
        Acquired::Owned(values) => {
            trace!(len = values.len(), %strategy, "increment_all on private copy");
            values
        }
        Acquired::Aliased(values) => {
            trace!(len = values.len(), %strategy, "increment_all in place");
            values
        }
    };
    strategy.apply(values);
}

/// Reverse the buffer in place.
pub fn reverse<B>(buffer: &B)
where
    B: ForeignBuffer<Element = i32> + ?Sized,
{
    let mut elements = Elements::acquire(buffer);
    nk_kernels::reverse(&mut elements);
}

/// Rotate the buffer right by `k`; negative `k` rotates left.
pub fn rotate_right<B>(buffer: &B, k: i32)
where
    B: ForeignBuffer<Element = i32> + ?Sized,
{
    let mut elements = Elements::acquire(buffer);
    nk_kernels::rotate_right(&mut elements, i64::from(k));
}

/// Wrapping sum of the buffer.
pub fn sum<B>(buffer: &B) -> i32
where
    B: ForeignBuffer<Element = i32> + ?Sized,
{
    let mut elements = Elements::acquire(buffer);
    elements.discard_changes();
    nk_kernels::sum(&elements)
}

/// Sort the buffer ascending in place.
pub fn sort_ascending<B>(buffer: &B)
where
    B: ForeignBuffer<Element = i32> + ?Sized,
{
    let mut elements = Elements::acquire(buffer);
    nk_kernels::sort_ascending(&mut elements);
}

/// Copy the buffer's contents out.
pub fn copy_array<B>(buffer: &B) -> Vec<i32>
where
    B: ForeignBuffer<Element = i32> + ?Sized,
{
    let mut elements = Elements::acquire(buffer);
    elements.discard_changes();
    elements.to_vec()
}

/// Whether the host serves this buffer with a private copy.
pub fn acquisition_is_copy<B>(buffer: &B) -> bool
where
    B: ForeignBuffer + ?Sized,
{
    let mut elements = Elements::acquire(buffer);
    elements.discard_changes();
    elements.is_copy()
}

/// Acquire and release without touching the elements.
pub fn touch<B>(buffer: &B)
where
    B: ForeignBuffer + ?Sized,
{
    let mut elements = Elements::acquire(buffer);
    elements.discard_changes();
}

/// A new host string holding `text` reversed by code unit.
///
/// An aliased view is never written; the reversal goes into a fresh
/// buffer instead.
pub fn reverse_string<S>(text: &S) -> S::Output
where
    S: ForeignString + ?Sized,
{
    let mut chars = Chars::acquire(text);
    let reversed = match chars.acquired() {
        AcquiredChars::Owned(units) => {
            nk_kernels::reverse(units);
            text.new_string(units)
        }
        AcquiredChars::Aliased(units) => {
            let mut out = vec![0u16; units.len()];
            nk_kernels::reverse_into(units, &mut out);
            text.new_string(&out)
        }
    };
    reversed
}

/// The constant greeting.
#[must_use]
pub fn greeting() -> &'static str {
    GREETING
}

/// Calibrate the process-wide timer with the default window.
///
/// Calling again replaces the previous estimate.
pub fn initialize() -> CycleTimer {
    initialize_with(&TimerConfig::default())
}

/// Calibrate the process-wide timer with an explicit window.
pub fn initialize_with(config: &TimerConfig) -> CycleTimer {
    let calibrated = CycleTimer::calibrate(config);
    let mut slot = TIMER.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        debug!("Replacing previous cycle timer calibration");
    }
    *slot = Some(calibrated);
    calibrated
}

/// The process-wide timer.
///
/// # Errors
///
/// Returns [`KernelError::TimerNotInitialized`] before [`initialize`].
pub fn calibrated_timer() -> KernelResult<CycleTimer> {
    TIMER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .ok_or(KernelError::TimerNotInitialized)
}

/// Raw counter reading.
#[must_use]
pub fn read_cycle_counter() -> u64 {
    timer::read_cycle_counter().raw()
}

/// Convert a cycle difference to seconds with the process-wide timer.
///
/// # Errors
///
/// Returns [`KernelError::TimerNotInitialized`] before [`initialize`].
pub fn cycles_to_seconds(cycles: u64) -> KernelResult<f64> {
    Ok(calibrated_timer()?.cycles_to_seconds(CycleDelta(cycles)))
}
