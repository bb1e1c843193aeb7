//! Benchmark report: two-column table and JSON export.

use crate::diagnostics::CpuInfo;
use anyhow::{Context, Result};
use nk_common::metrics::{TimedWork, TimedWorkSnapshot};
use nk_common::time::{format_frequency, format_nanoseconds};
use nk_kernels::simd::IncrementStrategy;
use nk_runtime::PinningStatus;
use serde::Serialize;
use std::path::Path;

/// Width of the label column in the printed table.
pub const LABEL_WIDTH: usize = 55;

/// Timing of one entry point.
#[derive(Debug, Clone, Serialize)]
pub struct KernelTiming {
    /// Entry point name.
    pub name: String,
    /// Whether the host served the buffer as a private copy.
    pub host_copied: bool,
    /// Timing summary.
    pub timing: TimedWorkSnapshot,
}

impl KernelTiming {
    /// Summarize `work` under `name`.
    pub fn new(name: &str, host_copied: bool, work: &TimedWork) -> Self {
        Self {
            name: name.to_string(),
            host_copied,
            timing: work.snapshot(),
        }
    }
}

/// Every kernel timed at one input size.
#[derive(Debug, Clone, Serialize)]
pub struct SizeReport {
    /// Element count.
    pub size: usize,
    /// Per-kernel timings.
    pub kernels: Vec<KernelTiming>,
}

/// Complete benchmark run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    /// Crate version that produced the report.
    pub version: &'static str,
    /// Host CPU.
    pub cpu: CpuInfo,
    /// Calibrated counter frequency in Hz.
    pub frequency_hz: u64,
    /// Vector strategy used for `increment_all_vectorized`.
    pub strategy: IncrementStrategy,
    /// Pinning that was applied.
    pub pinning: PinningStatus,
    /// Timer and boundary overhead.
    pub overhead: Vec<KernelTiming>,
    /// Per-size kernel timings.
    pub sizes: Vec<SizeReport>,
}

/// One table row, label padded or cut to [`LABEL_WIDTH`].
pub fn two_column(label: &str, value: &str) -> String {
    let label: String = label.chars().take(LABEL_WIDTH).collect();
    let value: String = value.chars().take(LABEL_WIDTH).collect();
    format!("{label:<LABEL_WIDTH$}{value}")
}

fn push_rows(lines: &mut Vec<String>, timing: &KernelTiming) {
    let title = if timing.host_copied {
        format!("{} [copy]", timing.name)
    } else {
        timing.name.clone()
    };
    for (label, value) in timing.timing.report_lines(&title) {
        lines.push(two_column(&label, &value));
    }
}

impl BenchReport {
    /// Table lines, ready to print.
    pub fn table(&self) -> Vec<String> {
        let mut lines = vec![
            two_column("=== Title ===", "=== Value ==="),
            two_column("Counter frequency", &format_frequency(self.frequency_hz)),
            two_column("Increment strategy", self.strategy.name()),
        ];

        for timing in &self.overhead {
            push_rows(&mut lines, timing);
        }
        for size in &self.sizes {
            lines.push(two_column(&format!("=== n = {} ===", size.size), ""));
            for timing in &size.kernels {
                push_rows(&mut lines, timing);
            }
        }
        lines
    }

    /// Median time of `kernel` at `size`, formatted.
    pub fn median(&self, size: usize, kernel: &str) -> Option<String> {
        self.sizes
            .iter()
            .find(|s| s.size == size)?
            .kernels
            .iter()
            .find(|k| k.name == kernel)?
            .timing
            .median_ns
            .map(format_nanoseconds)
    }

    /// Write the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Fails if serialization or the write fails.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }
}
