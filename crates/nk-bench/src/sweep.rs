//! Kernel timing sweep.
//!
//! For each input size a seeded array is built once, and every timed
//! iteration hands a fresh host copy of it to one entry point, so mutating
//! kernels never see their own output. Each entry point is paired with a
//! `native:` row running the same kernel on a plain `Vec`, so the gap
//! between the two is the cost of crossing the boundary.

use crate::report::{KernelTiming, SizeReport};
use nk_common::config::{CopyPolicy, KernelConfig, StopRule};
use nk_common::metrics::TimedWork;
use nk_kernels::simd::IncrementStrategy;
use nk_runtime::entry;
use nk_runtime::{CycleTimer, HostIntArray, HostString};
use std::hint::black_box;
use tracing::debug;

/// Xorshift64 generator for reproducible inputs.
#[derive(Debug, Clone)]
pub struct XorShift64(u64);

impl XorShift64 {
    /// Seeded generator; a zero seed is replaced, since zero is a fixed point.
    pub fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    /// Next raw value.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// `len` values spread over the whole `i32` range.
    pub fn ints(&mut self, len: usize) -> Vec<i32> {
        // Keep the high half; truncation is the point
        (0..len).map(|_| (self.next_u64() >> 32) as i32).collect()
    }

    /// `len` printable ASCII characters.
    pub fn ascii(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(b' ' + (self.next_u64() % 95) as u8))
            .collect()
    }
}

/// Times entry points against the reference host.
pub struct Sweep<'a> {
    timer: &'a CycleTimer,
    iterations: u32,
    stop_rule: StopRule,
    max_iterations: u32,
    policy: CopyPolicy,
    strategy: IncrementStrategy,
}

impl<'a> Sweep<'a> {
    /// Sweep driven by `config`, vectorizing with `strategy`.
    pub fn new(timer: &'a CycleTimer, config: &KernelConfig, strategy: IncrementStrategy) -> Self {
        Self {
            timer,
            iterations: config.bench.iterations,
            stop_rule: config.bench.stop_rule,
            max_iterations: config.bench.max_iterations,
            policy: config.host.copy_policy,
            strategy,
        }
    }

    fn measure<F>(&self, work: F) -> TimedWork
    where
        F: FnMut() -> u64,
    {
        match self.stop_rule {
            StopRule::Fixed => TimedWork::measure(self.iterations, work),
            StopRule::UntilStable => {
                TimedWork::measure_until_stable(self.iterations, self.max_iterations, work)
            }
        }
    }

    fn time_array<F>(&self, name: &str, input: &[i32], kernel: F) -> KernelTiming
    where
        F: Fn(&HostIntArray),
    {
        let work = self.measure(|| {
            let array = HostIntArray::with_policy(input.to_vec(), self.policy);
            let ((), delta) = self.timer.time(|| kernel(&array));
            self.timer.nanos(delta)
        });
        KernelTiming::new(name, self.policy.copies(input.len()), &work)
    }

    fn time_native<F>(&self, name: &str, input: &[i32], kernel: F) -> KernelTiming
    where
        F: Fn(&mut Vec<i32>),
    {
        let work = self.measure(|| {
            let mut values = input.to_vec();
            let ((), delta) = self.timer.time(|| kernel(&mut values));
            black_box(values);
            self.timer.nanos(delta)
        });
        KernelTiming::new(&format!("native: {name}"), false, &work)
    }

    /// Cost of the timer itself and of crossing the boundary with no work.
    pub fn overhead(&self) -> Vec<KernelTiming> {
        let timer = self.timer;
        let reads = self.measure(|| {
            let start = timer.now();
            let end = timer.now();
            timer.nanos(end - start)
        });
        let greeting = self.measure(|| {
            let (text, delta) = timer.time(entry::greeting);
            black_box(text);
            timer.nanos(delta)
        });

        vec![
            KernelTiming::new("read_cycle_counter x2", false, &reads),
            self.time_array("touch", &[0], |a| entry::touch(a)),
            KernelTiming::new("greeting", false, &greeting),
        ]
    }

    /// Time every kernel at one input size.
    pub fn run_size(&self, size: usize, rng: &mut XorShift64) -> SizeReport {
        debug!(size, iterations = self.iterations, "Timing kernels");
        let input = rng.ints(size);
        let k = i32::try_from(size / 3).unwrap_or(i32::MAX);
        let strategy = self.strategy;

        let mut kernels = vec![
            self.time_array("increment_all", &input, |a| entry::increment_all(a)),
            self.time_native("increment_all", &input, |v| {
                IncrementStrategy::Scalar.apply(v);
            }),
            self.time_array("increment_all_vectorized", &input, |a| {
                entry::increment_all_with(a, strategy);
            }),
            self.time_native("increment_all_vectorized", &input, |v| strategy.apply(v)),
            self.time_array("reverse", &input, |a| entry::reverse(a)),
            self.time_native("reverse", &input, |v| nk_kernels::reverse(v.as_mut_slice())),
            self.time_array("rotate_right", &input, |a| entry::rotate_right(a, k)),
            self.time_native("rotate_right", &input, |v| {
                nk_kernels::rotate_right(v.as_mut_slice(), i64::from(k));
            }),
            self.time_array("sort_ascending", &input, |a| entry::sort_ascending(a)),
            self.time_native("sort_ascending", &input, |v| nk_kernels::sort_ascending(v)),
            self.time_array("sum", &input, |a| {
                black_box(entry::sum(a));
            }),
            self.time_native("sum", &input, |v| {
                black_box(nk_kernels::sum(v));
            }),
            self.time_array("copy_array", &input, |a| {
                black_box(entry::copy_array(a));
            }),
            self.time_native("copy_array", &input, |v| {
                black_box(v.clone());
            }),
        ];

        let text = rng.ascii(size);
        let string_work = self.measure(|| {
            let host = HostString::with_policy(&text, self.policy);
            let (reversed, delta) = self.timer.time(|| entry::reverse_string(&host));
            black_box(reversed);
            self.timer.nanos(delta)
        });
        kernels.push(KernelTiming::new(
            "reverse_string",
            self.policy.copies(size),
            &string_work,
        ));

        let units: Vec<u16> = text.encode_utf16().collect();
        let native_string_work = self.measure(|| {
            let (reversed, delta) = self.timer.time(|| {
                let mut out = vec![0u16; units.len()];
                nk_kernels::reverse_into(&units, &mut out);
                out
            });
            black_box(reversed);
            self.timer.nanos(delta)
        });
        kernels.push(KernelTiming::new(
            "native: reverse_string",
            false,
            &native_string_work,
        ));

        SizeReport { size, kernels }
    }
}
