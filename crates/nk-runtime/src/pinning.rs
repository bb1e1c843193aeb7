//! Benchmark thread pinning and memory locking.
//!
//! Pins the calling thread to the configured CPUs and optionally locks all
//! pages with `mlockall` so page faults and migrations do not show up in
//! kernel timings. Linux only; other platforms log a warning and carry on.

use nk_common::config::{CpuAffinity, PinningConfig};
use nk_common::error::{KernelError, KernelResult};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What pinning actually achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PinningStatus {
    /// Whether memory was locked.
    pub memory_locked: bool,
    /// CPUs the thread is pinned to, if any.
    pub cpus: Option<Vec<usize>>,
}

/// Apply the pinning configuration to the calling thread.
///
/// Missing privileges (`EPERM`) and CPUs that do not exist (`EINVAL`) are
/// logged and reported as not applied rather than failing.
///
/// # Errors
///
/// Returns [`KernelError::Pinning`] for an out-of-range CPU index or an
/// unexpected syscall failure.
pub fn apply_pinning(config: &PinningConfig) -> KernelResult<PinningStatus> {
    if !config.enabled {
        debug!("Thread pinning disabled in configuration");
        return Ok(PinningStatus::default());
    }

    let memory_locked = if config.lock_memory {
        lock_memory()?
    } else {
        false
    };
    let cpus = set_cpu_affinity(&config.cpu_affinity)?;

    let status = PinningStatus {
        memory_locked,
        cpus,
    };
    info!(?status, "Thread pinning applied");
    Ok(status)
}

#[cfg(target_os = "linux")]
fn lock_memory() -> KernelResult<bool> {
    use nix::errno::Errno;
    use nix::sys::mman::{mlockall, MlockAllFlags};

    match mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
        Ok(()) => {
            debug!("Memory locked");
            Ok(true)
        }
        Err(Errno::EPERM | Errno::ENOMEM) => {
            warn!("mlockall not permitted (needs CAP_IPC_LOCK or a higher RLIMIT_MEMLOCK)");
            Ok(false)
        }
        Err(e) => Err(KernelError::Pinning(format!("mlockall failed: {e}"))),
    }
}

#[cfg(not(target_os = "linux"))]
fn lock_memory() -> KernelResult<bool> {
    warn!("mlockall not available on this platform");
    Ok(false)
}

#[cfg(target_os = "linux")]
fn set_cpu_affinity(affinity: &CpuAffinity) -> KernelResult<Option<Vec<usize>>> {
    use nix::errno::Errno;
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let cpus = affinity.cpus();
    if cpus.is_empty() {
        debug!("No CPU affinity configured");
        return Ok(None);
    }

    let mut cpu_set = CpuSet::new();
    for &cpu in &cpus {
        cpu_set
            .set(cpu)
            .map_err(|e| KernelError::Pinning(format!("invalid CPU index {cpu}: {e}")))?;
    }

    match sched_setaffinity(Pid::from_raw(0), &cpu_set) {
        Ok(()) => {
            debug!(?cpus, "CPU affinity set");
            Ok(Some(cpus))
        }
        Err(Errno::EINVAL | Errno::EPERM) => {
            warn!(?cpus, "CPU affinity not applied; CPUs unavailable or not permitted");
            Ok(None)
        }
        Err(e) => Err(KernelError::Pinning(format!("sched_setaffinity failed: {e}"))),
    }
}

#[cfg(not(target_os = "linux"))]
fn set_cpu_affinity(affinity: &CpuAffinity) -> KernelResult<Option<Vec<usize>>> {
    if !affinity.cpus().is_empty() {
        warn!("CPU affinity not available on this platform");
    }
    Ok(None)
}
