//! Reduction and ordering kernels.

/// Sum all elements in index order with two's-complement wraparound.
///
/// An empty slice sums to 0. Overflow wraps rather than trapping, matching
/// the host's fixed-width integer semantics.
///
/// ```
/// use nk_kernels::reduce::sum;
///
/// assert_eq!(sum(&[]), 0);
/// assert_eq!(sum(&[1, -2, 3]), 2);
/// assert_eq!(sum(&[i32::MAX, 1]), i32::MIN);
/// ```
#[must_use]
pub fn sum(values: &[i32]) -> i32 {
    values.iter().fold(0i32, |acc, &v| acc.wrapping_add(v))
}

/// Sort in place into non-decreasing order.
///
/// Unstable; equal integers are indistinguishable.
pub fn sort_ascending(values: &mut [i32]) {
    values.sort_unstable();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_empty() {
        assert_eq!(sum(&[]), 0);
    }

    #[test]
    fn test_sum_wraps_both_ways() {
        assert_eq!(sum(&[i32::MAX, i32::MAX]), -2);
        assert_eq!(sum(&[i32::MIN, -1]), i32::MAX);
    }

    #[test]
    fn test_sum_small_range() {
        let values: Vec<i32> = (-10..=10).collect();
        assert_eq!(sum(&values), 0);
    }

    #[test]
    fn test_sort_ascending() {
        let mut values = [5, -1, 3, 3, i32::MIN, 0, i32::MAX];
        sort_ascending(&mut values);
        assert_eq!(values, [i32::MIN, -1, 0, 3, 3, 5, i32::MAX]);
    }

    #[test]
    fn test_sort_trivial_inputs() {
        let mut empty: [i32; 0] = [];
        sort_ascending(&mut empty);

        let mut single = [42];
        sort_ascending(&mut single);
        assert_eq!(single, [42]);
    }
}
