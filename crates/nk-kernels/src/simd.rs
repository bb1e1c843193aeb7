//! Elementwise add-one with runtime-selected SIMD strategies.
//!
//! Every strategy produces output identical to a scalar wrapping `+1` on
//! each element. Vector strategies process the longest prefix whose length
//! is a multiple of [`LANE_WIDTH`] with 128-bit load/add/store, then finish
//! the `n % LANE_WIDTH` trailing elements with the scalar loop.
//!
//! Strategy selection happens once via [`IncrementStrategy::detect`] (or
//! [`IncrementStrategy::select`] to honour configuration) and the chosen
//! value is passed around, so targets without vector support simply run
//! [`IncrementStrategy::Scalar`].

use nk_common::config::SimdPreference;
use serde::Serialize;
use static_assertions::const_assert_eq;
use std::fmt;
use tracing::debug;

/// Number of `i32` lanes in one 128-bit vector register.
pub const LANE_WIDTH: usize = 4;

const_assert_eq!(LANE_WIDTH * std::mem::size_of::<i32>(), 16);

/// Implementation strategy for [`IncrementStrategy::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncrementStrategy {
    /// Portable scalar loop, always available.
    Scalar,
    /// x86_64 SSE2 (`_mm_add_epi32`).
    #[cfg(target_arch = "x86_64")]
    Sse2,
    /// AArch64 NEON (`vaddq_s32`).
    #[cfg(target_arch = "aarch64")]
    Neon,
}

impl IncrementStrategy {
    /// Detect the best strategy supported by the current CPU.
    #[must_use]
    pub fn detect() -> Self {
        let strategy = detect_strategy();
        debug!(%strategy, "Detected increment strategy");
        strategy
    }

    /// Pick a strategy honouring a configured preference.
    #[must_use]
    pub fn select(preference: SimdPreference) -> Self {
        match preference {
            SimdPreference::Auto => Self::detect(),
            SimdPreference::Scalar => IncrementStrategy::Scalar,
        }
    }

    /// Whether the running CPU can execute this strategy.
    #[must_use]
    pub fn is_available(self) -> bool {
        match self {
            IncrementStrategy::Scalar => true,
            #[cfg(target_arch = "x86_64")]
            IncrementStrategy::Sse2 => is_x86_feature_detected!("sse2"),
            #[cfg(target_arch = "aarch64")]
            IncrementStrategy::Neon => std::arch::is_aarch64_feature_detected!("neon"),
        }
    }

    /// Every strategy runnable on this CPU, scalar first.
    #[must_use]
    pub fn available() -> Vec<Self> {
        let mut all = vec![IncrementStrategy::Scalar];
        #[cfg(target_arch = "x86_64")]
        all.push(IncrementStrategy::Sse2);
        #[cfg(target_arch = "aarch64")]
        all.push(IncrementStrategy::Neon);
        all.retain(|s| s.is_available());
        all
    }

    /// Short lowercase name for reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            IncrementStrategy::Scalar => "scalar",
            #[cfg(target_arch = "x86_64")]
            IncrementStrategy::Sse2 => "sse2",
            #[cfg(target_arch = "aarch64")]
            IncrementStrategy::Neon => "neon",
        }
    }

    /// Add 1 (wrapping) to every element.
    ///
    /// A vector strategy the CPU cannot run falls back to the scalar loop.
    pub fn apply(self, values: &mut [i32]) {
        match self {
            IncrementStrategy::Scalar => increment_scalar(values),
            #[cfg(target_arch = "x86_64")]
            IncrementStrategy::Sse2 => {
                if self.is_available() {
                    // SAFETY: SSE2 support was just verified
                    unsafe { increment_sse2(values) }
                } else {
                    increment_scalar(values);
                }
            }
            #[cfg(target_arch = "aarch64")]
            IncrementStrategy::Neon => {
                if self.is_available() {
                    // SAFETY: NEON support was just verified
                    unsafe { increment_neon(values) }
                } else {
                    increment_scalar(values);
                }
            }
        }
    }
}

impl fmt::Display for IncrementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn detect_strategy() -> IncrementStrategy {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("sse2") {
            return IncrementStrategy::Sse2;
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            return IncrementStrategy::Neon;
        }
    }

    #[allow(unreachable_code)]
    IncrementStrategy::Scalar
}

/// Scalar add-one, also used for the vector strategies' remainder.
pub fn increment_scalar(values: &mut [i32]) {
    for value in values {
        *value = value.wrapping_add(1);
    }
}

/// SSE2 add-one.
///
/// # Safety
///
/// Caller must ensure SSE2 is available.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn increment_sse2(values: &mut [i32]) {
    use std::arch::x86_64::{
        __m128i, _mm_add_epi32, _mm_loadu_si128, _mm_set1_epi32, _mm_storeu_si128,
    };

    let ones = _mm_set1_epi32(1);
    let mut chunks = values.chunks_exact_mut(LANE_WIDTH);
    for chunk in &mut chunks {
        // Unaligned load/store: host buffers only guarantee i32 alignment
        let ptr = chunk.as_mut_ptr().cast::<__m128i>();
        let lanes = _mm_loadu_si128(ptr);
        _mm_storeu_si128(ptr, _mm_add_epi32(lanes, ones));
    }
    increment_scalar(chunks.into_remainder());
}

/// NEON add-one.
///
/// # Safety
///
/// Caller must ensure NEON is available.
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn increment_neon(values: &mut [i32]) {
    use std::arch::aarch64::{vaddq_s32, vdupq_n_s32, vld1q_s32, vst1q_s32};

    let ones = vdupq_n_s32(1);
    let mut chunks = values.chunks_exact_mut(LANE_WIDTH);
    for chunk in &mut chunks {
        let ptr = chunk.as_mut_ptr();
        let lanes = vld1q_s32(ptr);
        vst1q_s32(ptr, vaddq_s32(lanes, ones));
    }
    increment_scalar(chunks.into_remainder());
}
