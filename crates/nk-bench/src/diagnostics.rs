//! Host CPU information for benchmark reports.
//!
//! Reads `/proc/cpuinfo` when it exists. x86 kernels report `model name`
//! and `flags`; ARM kernels report `Hardware`/`CPU part` and `Features`.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

const CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Summary of the CPU the benchmark ran on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CpuInfo {
    /// Target architecture the binary was built for.
    pub arch: String,
    /// Model name, if the kernel reports one.
    pub model: Option<String>,
    /// Number of `processor` entries.
    pub processor_count: usize,
    /// Union of per-processor feature flags.
    pub features: BTreeSet<String>,
}

impl CpuInfo {
    /// Read the running system's CPU information.
    ///
    /// Falls back to the architecture alone when `/proc/cpuinfo` is missing.
    pub fn read() -> Self {
        match std::fs::read_to_string(CPUINFO_PATH) {
            Ok(text) => Self::parse(&text),
            Err(_) => Self {
                arch: std::env::consts::ARCH.to_string(),
                processor_count: std::thread::available_parallelism().map_or(0, usize::from),
                ..Self::default()
            },
        }
    }

    /// Parse `/proc/cpuinfo` text.
    pub fn parse(text: &str) -> Self {
        let mut info = Self {
            arch: std::env::consts::ARCH.to_string(),
            ..Self::default()
        };

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "processor" => info.processor_count += 1,
                "model name" | "Hardware" | "Model" if info.model.is_none() && !value.is_empty() => {
                    info.model = Some(value.to_string());
                }
                "flags" | "Features" => {
                    info.features
                        .extend(value.split_whitespace().map(str::to_string));
                }
                _ => {}
            }
        }

        info
    }

    /// Whether the CPU advertises `feature`.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Log the summary.
    pub fn log(&self) {
        let features = self
            .features
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        info!(
            arch = %self.arch,
            model = self.model.as_deref().unwrap_or("unknown"),
            processors = self.processor_count,
            %features,
            "CPU information"
        );
    }
}
