//! Common utilities for acceptance tests.

use nk_common::config::CopyPolicy;
use nk_runtime::HostIntArray;

/// Copy policies every kernel must behave identically under.
pub const ALL_POLICIES: [CopyPolicy; 4] = [
    CopyPolicy::AlwaysCopy,
    CopyPolicy::NeverCopy,
    CopyPolicy::CopyBelow(0),
    CopyPolicy::CopyBelow(usize::MAX),
];

/// Host arrays holding `values`, one per policy.
pub fn arrays_for(values: &[i32]) -> Vec<HostIntArray> {
    ALL_POLICIES
        .iter()
        .map(|&policy| HostIntArray::with_policy(values.to_vec(), policy))
        .collect()
}

/// Deterministic pseudo-random input.
pub fn seeded_values(len: usize, seed: u32) -> Vec<i32> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as i32
        })
        .collect()
}
