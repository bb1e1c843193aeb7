#![doc = "Foreign buffer access, reference host, cycle timer and entry surface for the native kernels."]

pub mod entry;
pub mod foreign;
pub mod host;
pub mod pinning;
pub mod timer;

pub use foreign::*;
pub use host::*;
pub use pinning::*;
pub use timer::*;
