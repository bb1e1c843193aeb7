//! Configuration structures for the kernel runtime and benchmark.
//!
//! Supports TOML deserialization with sensible defaults so an empty
//! file (or no file at all) yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Cycle timer calibration.
    pub timer: TimerConfig,

    /// Kernel strategy selection.
    pub kernels: KernelsConfig,

    /// Reference host behaviour.
    pub host: HostConfig,

    /// Benchmark sweep settings.
    pub bench: BenchConfig,
}

/// Cycle timer calibration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// How long to busy-wait while correlating the two clocks.
    #[serde(with = "humantime_serde")]
    pub calibration_window: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            calibration_window: Duration::from_secs(1),
        }
    }
}

impl TimerConfig {
    /// Calibration window in whole milliseconds, saturating at `u64::MAX`.
    #[must_use]
    pub fn window_ms(&self) -> u64 {
        u64::try_from(self.calibration_window.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Which elementwise strategy the vectorized entry points may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimdPreference {
    /// Use the best strategy the CPU supports.
    #[default]
    Auto,
    /// Always use the scalar loop.
    Scalar,
}

/// Kernel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelsConfig {
    /// SIMD strategy preference.
    pub simd: SimdPreference,
}

/// Policy deciding whether the reference host hands out a private copy
/// or a direct alias when a buffer is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyPolicy {
    /// Every acquisition is a private copy.
    AlwaysCopy,
    /// Every acquisition aliases the owner's storage.
    NeverCopy,
    /// Copy buffers shorter than the threshold, alias the rest.
    CopyBelow(usize),
}

impl Default for CopyPolicy {
    fn default() -> Self {
        CopyPolicy::CopyBelow(64)
    }
}

impl CopyPolicy {
    /// Whether an acquisition of `len` elements produces a copy.
    #[must_use]
    pub fn copies(self, len: usize) -> bool {
        match self {
            CopyPolicy::AlwaysCopy => true,
            CopyPolicy::NeverCopy => false,
            CopyPolicy::CopyBelow(threshold) => len < threshold,
        }
    }
}

/// Reference host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Copy-versus-alias policy for acquisitions.
    pub copy_policy: CopyPolicy,
}

/// When the benchmark stops timing one kernel at one size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopRule {
    /// Run exactly `iterations` times.
    #[default]
    Fixed,
    /// Run until min and max have held for `iterations` consecutive runs,
    /// capped at `max_iterations`.
    UntilStable,
}

/// Benchmark sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Element counts to sweep.
    pub sizes: Vec<usize>,

    /// Timed iterations per kernel and size, or the run of unchanged
    /// iterations that ends an [`StopRule::UntilStable`] measurement.
    pub iterations: u32,

    /// How `iterations` is interpreted.
    pub stop_rule: StopRule,

    /// Hard cap on iterations under [`StopRule::UntilStable`].
    pub max_iterations: u32,

    /// Seed for the pseudo-random inputs.
    pub seed: u64,

    /// Write a JSON report to this path.
    pub json_report: Option<PathBuf>,

    /// Thread pinning for lower measurement noise.
    pub pinning: PinningConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            sizes: vec![1, 10, 100, 1_000, 10_000, 100_000, 1_000_000],
            iterations: 20,
            stop_rule: StopRule::Fixed,
            max_iterations: 100_000,
            seed: 123,
            json_report: None,
            pinning: PinningConfig::default(),
        }
    }
}

/// Benchmark thread pinning configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PinningConfig {
    /// Apply pinning at all.
    pub enabled: bool,

    /// CPUs the benchmark thread may run on.
    pub cpu_affinity: CpuAffinity,

    /// Lock all memory pages (mlockall).
    pub lock_memory: bool,
}

/// CPU affinity specification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CpuAffinity {
    /// No affinity set (OS chooses).
    #[default]
    None,
    /// Pin to a single CPU core.
    Single(usize),
    /// Pin to a set of CPU cores.
    Set(Vec<usize>),
}

impl CpuAffinity {
    /// The CPUs named by this affinity, empty for [`CpuAffinity::None`].
    #[must_use]
    pub fn cpus(&self) -> Vec<usize> {
        match self {
            CpuAffinity::None => Vec::new(),
            CpuAffinity::Single(cpu) => vec![*cpu],
            CpuAffinity::Set(cpus) => cpus.clone(),
        }
    }
}

impl Serialize for CpuAffinity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            CpuAffinity::None => serializer.serialize_none(),
            CpuAffinity::Single(cpu) => serializer.serialize_u64(*cpu as u64),
            CpuAffinity::Set(cpus) => cpus.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CpuAffinity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct CpuAffinityVisitor;

        impl<'de> Visitor<'de> for CpuAffinityVisitor {
            type Value = CpuAffinity;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("null, an integer, or an array of integers")
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(CpuAffinity::None)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(CpuAffinity::None)
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(CpuAffinity::Single(value as usize))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if value < 0 {
                    return Err(de::Error::custom("CPU index cannot be negative"));
                }
                Ok(CpuAffinity::Single(value as usize))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut cpus = Vec::new();
                while let Some(cpu) = seq.next_element::<usize>()? {
                    cpus.push(cpu);
                }
                Ok(CpuAffinity::Set(cpus))
            }
        }

        deserializer.deserialize_any(CpuAffinityVisitor)
    }
}

impl KernelConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        tracing::debug!(?path, "Reading configuration file");
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
