//! Native kernel benchmark entry point.
//!
//! Calibrates the cycle timer, then times every entry point against the
//! reference host across a sweep of input sizes and prints a two-column
//! table, optionally writing a JSON report.

mod diagnostics;
mod report;
mod sweep;

use anyhow::{Context, Result};
use clap::Parser;
use nk_common::config::{KernelConfig, SimdPreference, StopRule};
use nk_kernels::simd::IncrementStrategy;
use nk_runtime::{apply_pinning, entry};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::diagnostics::CpuInfo;
use crate::report::BenchReport;
use crate::sweep::{Sweep, XorShift64};

/// Benchmark command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "nk-bench",
    about = "Native kernel benchmark - times array kernels across the host boundary",
    version,
    long_about = None
)]
struct Args {
    /// Path to a configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Input sizes to sweep, comma separated (overrides config file).
    #[arg(long, short = 's', value_delimiter = ',')]
    sizes: Option<Vec<usize>>,

    /// Timed iterations per kernel and size (overrides config file).
    #[arg(long, short = 'n')]
    iterations: Option<u32>,

    /// Keep timing until min and max hold for `--iterations` runs.
    #[arg(long)]
    until_stable: bool,

    /// Seed for generated inputs (overrides config file).
    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON report to this path (overrides config file).
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Force the scalar increment even where vector units exist.
    #[arg(long)]
    scalar: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting native kernel benchmark");

    let mut config = load_config(&args)?;
    apply_overrides(&mut config, &args);

    info!(
        sizes = ?config.bench.sizes,
        iterations = config.bench.iterations,
        stop_rule = ?config.bench.stop_rule,
        copy_policy = ?config.host.copy_policy,
        "Configuration loaded"
    );

    run(&config)
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!(
        "nk_bench={},nk_runtime={},nk_kernels={},nk_common={}",
        level, level, level, level
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `NK_CONFIG_PATH` environment variable
/// 3. `config/default.toml` (local development)
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<KernelConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return KernelConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    if let Ok(env_path) = std::env::var("NK_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from NK_CONFIG_PATH");
            return KernelConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from NK_CONFIG_PATH={env_path}")
            });
        }
        warn!(
            path = %env_path,
            "NK_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let local_path = PathBuf::from("config/default.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from local path");
        return KernelConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {}", local_path.display()));
    }

    info!("No config file found, using built-in defaults");
    Ok(KernelConfig::default())
}

/// Fold command-line overrides into the loaded configuration.
fn apply_overrides(config: &mut KernelConfig, args: &Args) {
    if let Some(sizes) = &args.sizes {
        config.bench.sizes.clone_from(sizes);
    }
    if let Some(iterations) = args.iterations {
        config.bench.iterations = iterations;
    }
    if args.until_stable {
        config.bench.stop_rule = StopRule::UntilStable;
    }
    if let Some(seed) = args.seed {
        config.bench.seed = seed;
    }
    if let Some(json) = &args.json {
        config.bench.json_report = Some(json.clone());
    }
    if args.scalar {
        config.kernels.simd = SimdPreference::Scalar;
    }
}

/// Calibrate, sweep, and report.
fn run(config: &KernelConfig) -> Result<()> {
    let pinning =
        apply_pinning(&config.bench.pinning).context("Failed to pin benchmark thread")?;

    let cpu = CpuInfo::read();
    cpu.log();

    let timer = entry::initialize_with(&config.timer);
    let strategy = IncrementStrategy::select(config.kernels.simd);
    info!(%strategy, "Increment strategy selected");

    if config.bench.iterations == 0 {
        warn!("Iteration count is zero; every timing will be empty");
    }

    let sweep = Sweep::new(&timer, config, strategy);
    let overhead = sweep.overhead();

    let mut rng = XorShift64::new(config.bench.seed);
    let sizes = config
        .bench
        .sizes
        .iter()
        .map(|&size| sweep.run_size(size, &mut rng))
        .collect();

    let report = BenchReport {
        version: env!("CARGO_PKG_VERSION"),
        cpu,
        frequency_hz: timer.frequency().hz(),
        strategy,
        pinning,
        overhead,
        sizes,
    };

    for line in report.table() {
        println!("{line}");
    }

    if let Some(&largest) = config.bench.sizes.iter().max() {
        info!(
            size = largest,
            scalar = report.median(largest, "increment_all").as_deref().unwrap_or("-"),
            vectorized = report
                .median(largest, "increment_all_vectorized")
                .as_deref()
                .unwrap_or("-"),
            "Median increment time"
        );
    }

    if let Some(path) = &config.bench.json_report {
        report.write_json(path)?;
        info!(path = %path.display(), "JSON report written");
    }

    Ok(())
}
