//! Acceptance test modules.

mod common;
mod config_test;
mod kernels_test;
mod timer_test;
