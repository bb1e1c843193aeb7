//! Acceptance tests for the native kernels.
//!
//! These drive the entry surface end to end through the reference host:
//! - Kernel results under every copy policy
//! - Acquire/release pairing and commit behavior
//! - Timer calibration against the wall clock
//! - Configuration files loaded from disk

mod acceptance;
