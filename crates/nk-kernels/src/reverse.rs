//! Reversal and rotation kernels.
//!
//! Right rotation uses the triple-reversal technique: O(n) time and O(1)
//! extra space.
//!
//! ```text
//! rotate right by 3:
//! [1, 2, 3, 4, 5]   reverse whole       -> [5, 4, 3, 2, 1]
//! [5, 4, 3 | 2, 1]  reverse [0, 3)      -> [3, 4, 5, 2, 1]
//! [3, 4, 5 | 2, 1]  reverse [3, 5)      -> [3, 4, 5, 1, 2]
//! ```

/// Reverse the half-open range `[start, end)` by swapping from both ends.
///
/// Ranges of length 0 or 1 are left untouched.
///
/// # Panics
///
/// Panics if `end > values.len()` or `start > end`.
fn reverse_range<T>(values: &mut [T], start: usize, end: usize) {
    assert!(start <= end && end <= values.len(), "range out of bounds");
    if end - start < 2 {
        return;
    }
    let (mut left, mut right) = (start, end - 1);
    while left < right {
        values.swap(left, right);
        left += 1;
        right -= 1;
    }
}

/// Reverse a slice in place.
///
/// ```
/// use nk_kernels::reverse::reverse;
///
/// let mut values = [1, 2, 3, 4];
/// reverse(&mut values);
/// assert_eq!(values, [4, 3, 2, 1]);
/// ```
pub fn reverse<T>(values: &mut [T]) {
    reverse_range(values, 0, values.len());
}

/// Rotate right by `k` positions in place.
///
/// The last `k mod n` elements move to the front, each segment keeping its
/// relative order. `k` is reduced with Euclidean remainder, so a negative
/// `k` rotates left. Empty slices and offsets that are multiples of the
/// length are no-ops.
///
/// ```
/// use nk_kernels::reverse::rotate_right;
///
/// let mut values = [1, 2, 3, 4, 5];
/// rotate_right(&mut values, 3);
/// assert_eq!(values, [3, 4, 5, 1, 2]);
///
/// rotate_right(&mut values, -3);
/// assert_eq!(values, [1, 2, 3, 4, 5]);
/// ```
pub fn rotate_right<T>(values: &mut [T], k: i64) {
    let n = values.len();
    if n == 0 {
        return;
    }
    let pivot = rotation_offset(k, n);
    if pivot == 0 {
        return;
    }

    reverse_range(values, 0, n);
    reverse_range(values, 0, pivot);
    reverse_range(values, pivot, n);
}

/// Reduce `k` into `[0, n)`. `n` must be non-zero.
fn rotation_offset(k: i64, n: usize) -> usize {
    // i128 holds every i64 and every usize, so neither conversion can fail
    let reduced = i128::from(k).rem_euclid(n as i128);
    usize::try_from(reduced).unwrap_or(0)
}

/// Write `src` reversed into `dst`, leaving `src` untouched.
///
/// Used when the source aliases storage that must not be mutated. For odd
/// lengths the middle element is copied across rather than swapped.
///
/// # Panics
///
/// Panics if the slices differ in length.
///
/// ```
/// use nk_kernels::reverse::reverse_into;
///
/// let src: Vec<u16> = "Hello".encode_utf16().collect();
/// let mut dst = vec![0u16; src.len()];
/// reverse_into(&src, &mut dst);
/// assert_eq!(String::from_utf16(&dst).unwrap(), "olleH");
/// ```
pub fn reverse_into<T: Copy>(src: &[T], dst: &mut [T]) {
    assert_eq!(src.len(), dst.len(), "reverse_into length mismatch");
    let n = src.len();
    if n == 0 {
        return;
    }
    let (mut left, mut right) = (0, n - 1);
    while left < right {
        dst[left] = src[right];
        dst[right] = src[left];
        left += 1;
        right -= 1;
    }
    if left == right {
        dst[left] = src[right];
    }
}
