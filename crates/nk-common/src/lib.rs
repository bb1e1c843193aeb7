#![doc = "Common types shared across the native-kernels workspace."]

pub mod config;
pub mod error;
pub mod metrics;
pub mod time;

pub use config::*;
pub use error::*;
pub use metrics::*;
pub use time::*;
