//! Array kernels over `i32` and UTF-16 code-unit slices.
//!
//! This crate holds the pure algorithms; acquiring and releasing the
//! foreign buffers they run on is `nk-runtime`'s job.
//!
//! - **Reduction & ordering** ([`reduce`]): wrapping sum, ascending sort
//! - **Reversal & rotation** ([`reverse`]): reversal, three-reversal right rotation,
//!   code-unit reversal into a fresh buffer
//! - **Elementwise** ([`simd`]): add-one with scalar, SSE2 and NEON strategies
//!
//! # Example
//!
//! ```
//! use nk_kernels::{reduce, reverse, simd::IncrementStrategy};
//!
//! let mut values = [1, 2, 3, 4, 5];
//! reverse::rotate_right(&mut values, 3);
//! assert_eq!(values, [3, 4, 5, 1, 2]);
//!
//! IncrementStrategy::detect().apply(&mut values);
//! assert_eq!(values, [4, 5, 6, 2, 3]);
//!
//! reduce::sort_ascending(&mut values);
//! assert_eq!(reduce::sum(&values), 20);
//! ```

pub mod reduce;
pub mod reverse;
pub mod simd;

// Re-export main entry points for convenience
pub use reduce::{sort_ascending, sum};
pub use reverse::{reverse, reverse_into, rotate_right};
pub use simd::{IncrementStrategy, LANE_WIDTH};
