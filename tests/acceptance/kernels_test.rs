//! Kernel acceptance tests through the entry surface.
//!
//! # Acceptance Criteria
//!
//! - Results are identical whether the host copies or aliases
//! - Each call acquires and releases exactly once
//! - Only mutating kernels commit

use super::common::{arrays_for, seeded_values, ALL_POLICIES};
use nk_common::config::CopyPolicy;
use nk_kernels::simd::{IncrementStrategy, LANE_WIDTH};
use nk_runtime::entry;
use nk_runtime::{HostIntArray, HostString};

#[test]
fn test_documented_examples() {
    for array in arrays_for(&[1, 2, 3, 4, 5]) {
        entry::increment_all_vectorized(&array);
        assert_eq!(array.to_vec(), [2, 3, 4, 5, 6]);
    }
    for array in arrays_for(&[1, 2, 3, 4, 5]) {
        entry::rotate_right(&array, 3);
        assert_eq!(array.to_vec(), [3, 4, 5, 1, 2]);
    }
    let hello = HostString::from("Hello");
    assert_eq!(entry::reverse_string(&hello).to_string(), "olleH");
    assert_eq!(entry::greeting(), "Hello, World!");
}

#[test]
fn test_scalar_and_vector_agree_across_lane_boundaries() {
    for len in 0..=(2 * LANE_WIDTH + 3) {
        let input = seeded_values(len, 17);
        for policy in ALL_POLICIES {
            let scalar = HostIntArray::with_policy(input.clone(), policy);
            let vector = HostIntArray::with_policy(input.clone(), policy);
            entry::increment_all(&scalar);
            entry::increment_all_vectorized(&vector);
            assert_eq!(scalar.to_vec(), vector.to_vec(), "len {len} {policy:?}");
        }
    }
}

#[test]
fn test_every_available_strategy_matches() {
    let input = seeded_values(1_003, 5);
    let expected: Vec<i32> = input.iter().map(|v| v.wrapping_add(1)).collect();
    for strategy in IncrementStrategy::available() {
        let array = HostIntArray::with_policy(input.clone(), CopyPolicy::NeverCopy);
        entry::increment_all_with(&array, strategy);
        assert_eq!(array.to_vec(), expected, "{strategy}");
    }
}

#[test]
fn test_rotate_then_complement_restores() {
    let input = seeded_values(37, 3);
    let n = input.len() as i32;
    for k in [0, 1, 5, 36, 37, 100, -4] {
        let array = HostIntArray::new(input.clone());
        entry::rotate_right(&array, k);
        entry::rotate_right(&array, n - k.rem_euclid(n));
        assert_eq!(array.to_vec(), input, "k = {k}");
    }
}

#[test]
fn test_sort_then_sum() {
    let input = seeded_values(500, 11);
    let expected_sum = input.iter().fold(0i32, |acc, v| acc.wrapping_add(*v));
    for array in arrays_for(&input) {
        entry::sort_ascending(&array);
        let sorted = array.to_vec();
        assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(entry::sum(&array), expected_sum);
    }
}

#[test]
fn test_double_reverse_is_identity() {
    let input = seeded_values(101, 23);
    for array in arrays_for(&input) {
        entry::reverse(&array);
        entry::reverse(&array);
        assert_eq!(array.to_vec(), input);
        assert_eq!(array.stats().acquisitions, 2);
        assert_eq!(array.stats().commits, 2);
    }
}

#[test]
fn test_read_only_calls_leave_owner_untouched() {
    let input = seeded_values(64, 29);
    for array in arrays_for(&input) {
        let _ = entry::sum(&array);
        assert_eq!(entry::copy_array(&array), input);
        let _ = entry::acquisition_is_copy(&array);
        entry::touch(&array);

        let stats = array.stats();
        assert_eq!(stats.acquisitions, 4);
        assert!(stats.balanced());
        assert_eq!(stats.commits, 0);
        assert_eq!(array.to_vec(), input);
    }
}

#[test]
fn test_copy_reporting_follows_policy() {
    let small = HostIntArray::with_policy(vec![0; 3], CopyPolicy::CopyBelow(4));
    let large = HostIntArray::with_policy(vec![0; 4], CopyPolicy::CopyBelow(4));
    assert!(entry::acquisition_is_copy(&small));
    assert!(!entry::acquisition_is_copy(&large));
}

#[test]
fn test_string_reversal_round_trips() {
    for text in ["", "a", "ab", "abc", "Hello, World!", "naïve ☃"] {
        for policy in [CopyPolicy::AlwaysCopy, CopyPolicy::NeverCopy] {
            let host = HostString::with_policy(text, policy);
            let once = entry::reverse_string(&host);
            let twice = entry::reverse_string(&once);
            assert_eq!(twice, host, "{text:?} {policy:?}");
            assert!(host.stats().balanced());
        }
    }
}
