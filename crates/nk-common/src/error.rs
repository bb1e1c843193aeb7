use thiserror::Error;

/// Error types surfaced by the kernel runtime and its tooling.
///
/// The kernels themselves are infallible; these cover configuration,
/// timer lifecycle, and the benchmark's environment setup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A timing query ran before the cycle timer was calibrated.
    #[error("cycle timer not initialized: call initialize() first")]
    TimerNotInitialized,

    /// I/O operation error.
    #[error("I/O error: {0}")]
    Io(String),

    /// CPU pinning or memory locking failed.
    #[error("pinning error: {0}")]
    Pinning(String),
}

/// Convenience type alias for kernel runtime operations.
pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            KernelError::Config("bad window".into()).to_string(),
            "configuration error: bad window"
        );
        assert!(KernelError::TimerNotInitialized
            .to_string()
            .contains("initialize()"));
    }
}
