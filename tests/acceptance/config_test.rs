//! Configuration acceptance tests.
//!
//! Loads TOML files from disk and checks the values reach the host and
//! timer.

use nk_common::config::{CopyPolicy, CpuAffinity, KernelConfig, SimdPreference};
use nk_kernels::simd::IncrementStrategy;
use nk_runtime::{entry, HostIntArray};
use std::io::Write;
use std::time::Duration;

const SAMPLE: &str = r#"
[timer]
calibration_window = "15ms"

[kernels]
simd = "scalar"

[host]
copy_policy = { copy_below = 8 }

[bench]
sizes = [3, 30]
iterations = 4
seed = 99

[bench.pinning]
enabled = false
cpu_affinity = [0, 1]
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(SAMPLE);
    let config = KernelConfig::from_file(file.path()).unwrap();

    assert_eq!(config.timer.calibration_window, Duration::from_millis(15));
    assert_eq!(config.kernels.simd, SimdPreference::Scalar);
    assert_eq!(config.host.copy_policy, CopyPolicy::CopyBelow(8));
    assert_eq!(config.bench.sizes, vec![3, 30]);
    assert_eq!(config.bench.iterations, 4);
    assert_eq!(config.bench.seed, 99);
    assert_eq!(config.bench.pinning.cpu_affinity, CpuAffinity::Set(vec![0, 1]));
}

#[test]
fn test_configured_policy_drives_host() {
    let file = write_config(SAMPLE);
    let config = KernelConfig::from_file(file.path()).unwrap();

    for &size in &config.bench.sizes {
        let array = HostIntArray::with_policy(vec![1; size], config.host.copy_policy);
        assert_eq!(entry::acquisition_is_copy(&array), size < 8, "size {size}");
    }
    assert_eq!(
        IncrementStrategy::select(config.kernels.simd),
        IncrementStrategy::Scalar
    );
}

#[test]
fn test_configured_window_reaches_timer() {
    let file = write_config(SAMPLE);
    let config = KernelConfig::from_file(file.path()).unwrap();
    let timer = nk_runtime::CycleTimer::calibrate(&config.timer);
    assert_eq!(timer.window(), Duration::from_millis(15));
}

#[test]
fn test_round_trip_through_disk() {
    let original = KernelConfig::from_toml(SAMPLE).unwrap();
    let file = write_config(&original.to_toml().unwrap());
    let reloaded = KernelConfig::from_file(file.path()).unwrap();
    assert_eq!(reloaded.host.copy_policy, original.host.copy_policy);
    assert_eq!(reloaded.bench.sizes, original.bench.sizes);
    assert_eq!(
        reloaded.timer.calibration_window,
        original.timer.calibration_window
    );
}

#[test]
fn test_malformed_file_is_rejected() {
    let file = write_config("[host]\ncopy_policy = 12\n");
    assert!(KernelConfig::from_file(file.path()).is_err());
}

#[test]
fn test_missing_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    assert!(KernelConfig::from_file(&dir.path().join("absent.toml")).is_err());
}
