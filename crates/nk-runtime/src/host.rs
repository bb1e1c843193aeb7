//! In-process reference host.
//!
//! Owns arrays and strings the way a managed runtime would, and hands out
//! views according to a [`CopyPolicy`]. Tests and the benchmark drive the
//! entry surface through these types. Every acquisition, release and commit
//! is counted so the acquire/release pairing can be checked.
//!
//! Handles are `!Sync`: one call at a time may work on a given buffer, and a
//! second acquisition while one is outstanding panics.

use crate::foreign::{ForeignBuffer, ForeignString, RawElements, ReleaseMode};
use nk_common::config::CopyPolicy;
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::ptr::NonNull;

/// Access counters for one host buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessStats {
    /// Views handed out.
    pub acquisitions: u32,
    /// Views given back.
    pub releases: u32,
    /// Releases that asked for a commit.
    pub commits: u32,
    /// Acquisitions served with a private copy.
    pub copies: u32,
}

impl AccessStats {
    /// Whether every acquisition has been released.
    #[must_use]
    pub fn balanced(&self) -> bool {
        self.acquisitions == self.releases
    }
}

/// Bookkeeping shared by arrays and strings.
#[derive(Debug, Default)]
struct Ledger {
    outstanding: Cell<bool>,
    stats: Cell<AccessStats>,
}

impl Ledger {
    fn begin(&self, is_copy: bool) {
        assert!(
            !self.outstanding.replace(true),
            "host buffer acquired twice without release"
        );
        let mut stats = self.stats.get();
        stats.acquisitions += 1;
        if is_copy {
            stats.copies += 1;
        }
        self.stats.set(stats);
    }

    fn end(&self, committed: bool) {
        assert!(
            self.outstanding.replace(false),
            "host buffer released without acquisition"
        );
        let mut stats = self.stats.get();
        stats.releases += 1;
        if committed {
            stats.commits += 1;
        }
        self.stats.set(stats);
    }

    fn assert_idle(&self) {
        assert!(
            !self.outstanding.get(),
            "host buffer inspected while a view is outstanding"
        );
    }
}

/// Leak a private copy of `values` for the duration of an acquisition.
fn leak_copy<T: Copy>(values: &[T]) -> NonNull<T> {
    let copy: Box<[T]> = values.into();
    NonNull::from(Box::leak(copy)).cast::<T>()
}

/// Reclaim a copy produced by [`leak_copy`].
///
/// # Safety
///
/// `raw` must describe a live allocation from [`leak_copy`].
unsafe fn reclaim_copy<T>(raw: &RawElements<T>) -> Box<[T]> {
    Box::from_raw(std::ptr::slice_from_raw_parts_mut(
        raw.ptr().as_ptr(),
        raw.len(),
    ))
}

/// A host-owned mutable array.
pub struct HostArray<T: Copy> {
    data: UnsafeCell<Box<[T]>>,
    len: usize,
    policy: CopyPolicy,
    ledger: Ledger,
}

/// Host array of signed 32-bit integers.
pub type HostIntArray = HostArray<i32>;

impl<T: Copy> HostArray<T> {
    /// Create an array using the default copy policy.
    #[must_use]
    pub fn new(values: Vec<T>) -> Self {
        Self::with_policy(values, CopyPolicy::default())
    }

    /// Create an array with an explicit copy policy.
    #[must_use]
    pub fn with_policy(values: Vec<T>, policy: CopyPolicy) -> Self {
        Self {
            len: values.len(),
            data: UnsafeCell::new(values.into_boxed_slice()),
            policy,
            ledger: Ledger::default(),
        }
    }

    /// The copy policy in force.
    #[must_use]
    pub fn policy(&self) -> CopyPolicy {
        self.policy
    }

    /// Snapshot of the owner's storage.
    ///
    /// # Panics
    ///
    /// Panics if a view is outstanding.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.ledger.assert_idle();
        // SAFETY: no view is outstanding, so nothing else touches the data
        unsafe { (*self.data.get()).to_vec() }
    }

    /// Access counters.
    #[must_use]
    pub fn stats(&self) -> AccessStats {
        self.ledger.stats.get()
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for HostArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostArray")
            .field("len", &self.len())
            .field("policy", &self.policy)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

// SAFETY: views point either at a fresh leaked copy or at the boxed slice,
// which is never reallocated while the array lives; commits copy back into
// the same slice
unsafe impl<T: Copy> ForeignBuffer for HostArray<T> {
    type Element = T;

    fn len(&self) -> usize {
        self.len
    }

    fn acquire(&self) -> RawElements<T> {
        let len = self.len();
        let is_copy = self.policy.copies(len);
        self.ledger.begin(is_copy);

        // SAFETY: the ledger just ensured no other view is outstanding
        let data = unsafe { &mut *self.data.get() };
        let ptr = if is_copy {
            leak_copy(data)
        } else {
            NonNull::from(&mut data[..]).cast::<T>()
        };
        RawElements::new(ptr, len, is_copy)
    }

    unsafe fn release(&self, raw: RawElements<T>, mode: ReleaseMode) {
        if raw.is_copy() {
            let copy = reclaim_copy(&raw);
            if mode == ReleaseMode::Commit {
                (*self.data.get()).copy_from_slice(&copy);
            }
        }
        self.ledger.end(mode == ReleaseMode::Commit);
    }
}

/// A host-owned immutable UTF-16 string.
pub struct HostString {
    units: Box<[u16]>,
    policy: CopyPolicy,
    ledger: Ledger,
}

impl HostString {
    /// Create a string from code units with an explicit copy policy.
    #[must_use]
    pub fn from_units(units: Vec<u16>, policy: CopyPolicy) -> Self {
        Self {
            units: units.into_boxed_slice(),
            policy,
            ledger: Ledger::default(),
        }
    }

    /// Encode `text` as UTF-16 with an explicit copy policy.
    #[must_use]
    pub fn with_policy(text: &str, policy: CopyPolicy) -> Self {
        Self::from_units(text.encode_utf16().collect(), policy)
    }

    /// The code units.
    #[must_use]
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Access counters.
    #[must_use]
    pub fn stats(&self) -> AccessStats {
        self.ledger.stats.get()
    }
}

impl From<&str> for HostString {
    fn from(text: &str) -> Self {
        Self::with_policy(text, CopyPolicy::default())
    }
}

impl fmt::Display for HostString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decoded: String = char::decode_utf16(self.units.iter().copied())
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        f.write_str(&decoded)
    }
}

impl fmt::Debug for HostString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostString")
            .field("text", &self.to_string())
            .field("policy", &self.policy)
            .field("stats", &self.stats())
            .finish()
    }
}

impl PartialEq for HostString {
    fn eq(&self, other: &Self) -> bool {
        self.units == other.units
    }
}

// SAFETY: aliased views point at the boxed units, which are never written
// or reallocated; copies are leaked boxes reclaimed on release
unsafe impl ForeignString for HostString {
    type Output = HostString;

    fn len(&self) -> usize {
        self.units.len()
    }

    fn acquire_chars(&self) -> RawElements<u16> {
        let is_copy = self.policy.copies(self.units.len());
        self.ledger.begin(is_copy);
        let ptr = if is_copy {
            leak_copy(&self.units)
        } else {
            NonNull::from(&self.units[..]).cast::<u16>()
        };
        RawElements::new(ptr, self.units.len(), is_copy)
    }

    unsafe fn release_chars(&self, raw: RawElements<u16>) {
        if raw.is_copy() {
            drop(reclaim_copy(&raw));
        }
        self.ledger.end(false);
    }

    fn new_string(&self, units: &[u16]) -> HostString {
        HostString::from_units(units.to_vec(), self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreign::{Acquired, AcquiredChars, Chars, Elements};

    #[test]
    fn test_copy_commit_reaches_owner() {
        let array = HostIntArray::with_policy(vec![1, 2, 3], CopyPolicy::AlwaysCopy);
        {
            let mut elements = Elements::acquire(&array);
            assert!(elements.is_copy());
            elements[0] = 10;
        }
        assert_eq!(array.to_vec(), vec![10, 2, 3]);
        let stats = array.stats();
        assert_eq!(stats.copies, 1);
        assert_eq!(stats.commits, 1);
        assert!(stats.balanced());
    }

    #[test]
    fn test_copy_abort_discards() {
        let array = HostIntArray::with_policy(vec![1, 2, 3], CopyPolicy::AlwaysCopy);
        {
            let mut elements = Elements::acquire(&array);
            elements[0] = 10;
            elements.discard_changes();
        }
        assert_eq!(array.to_vec(), vec![1, 2, 3]);
        assert_eq!(array.stats().commits, 0);
        assert!(array.stats().balanced());
    }

    #[test]
    fn test_alias_writes_land_immediately() {
        let array = HostIntArray::with_policy(vec![1, 2, 3], CopyPolicy::NeverCopy);
        {
            let mut elements = Elements::acquire(&array);
            match elements.acquired() {
                Acquired::Aliased(values) => values[2] = 30,
                Acquired::Owned(_) => panic!("expected an aliased view"),
            }
            elements.discard_changes();
        }
        // Abort cannot undo writes through an alias
        assert_eq!(array.to_vec(), vec![1, 2, 30]);
        assert_eq!(array.stats().copies, 0);
    }

    #[test]
    fn test_copy_below_threshold() {
        let small = HostIntArray::with_policy(vec![0; 3], CopyPolicy::CopyBelow(4));
        let large = HostIntArray::with_policy(vec![0; 4], CopyPolicy::CopyBelow(4));
        assert!(Elements::acquire(&small).is_copy());
        assert!(!Elements::acquire(&large).is_copy());
        assert!(small.stats().balanced());
        assert!(large.stats().balanced());
    }

    #[test]
    fn test_empty_array_acquire_release() {
        for policy in [CopyPolicy::AlwaysCopy, CopyPolicy::NeverCopy] {
            let array = HostIntArray::with_policy(Vec::new(), policy);
            {
                let elements = Elements::acquire(&array);
                assert!(elements.is_empty());
            }
            assert_eq!(array.stats().acquisitions, 1);
            assert!(array.stats().balanced());
        }
    }

    #[test]
    #[should_panic(expected = "acquired twice")]
    fn test_double_acquire_panics() {
        let array = HostIntArray::new(vec![1]);
        let _first = Elements::acquire(&array);
        let _second = Elements::acquire(&array);
    }

    #[test]
    fn test_overlapping_alias_is_refused() {
        let array = HostIntArray::with_policy(vec![1, 2, 3, 4], CopyPolicy::NeverCopy);
        let mut first = Elements::acquire(&array);
        assert!(!first.is_copy());

        let second = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _second = Elements::acquire(&array);
        }));
        assert!(second.is_err());

        first[0] = 7;
        drop(first);
        assert_eq!(array.to_vec(), vec![7, 2, 3, 4]);
        assert_eq!(array.stats().acquisitions, 1);
        assert!(array.stats().balanced());

        // Released, so the buffer can be acquired again
        let again = Elements::acquire(&array);
        assert_eq!(again[0], 7);
    }

    #[test]
    fn test_release_on_unwind() {
        let array = HostIntArray::with_policy(vec![1, 2], CopyPolicy::AlwaysCopy);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut elements = Elements::acquire(&array);
            elements[0] = 5;
            panic!("kernel failure");
        }));
        assert!(result.is_err());
        assert!(array.stats().balanced());
        assert_eq!(array.to_vec(), vec![5, 2]);
    }

    #[test]
    fn test_string_views() {
        let copied = HostString::with_policy("abc", CopyPolicy::AlwaysCopy);
        let aliased = HostString::with_policy("abc", CopyPolicy::NeverCopy);
        {
            let mut chars = Chars::acquire(&copied);
            assert!(matches!(chars.acquired(), AcquiredChars::Owned(_)));
        }
        {
            let mut chars = Chars::acquire(&aliased);
            assert!(matches!(chars.acquired(), AcquiredChars::Aliased(_)));
            assert_eq!(chars.as_slice(), aliased.units());
        }
        assert!(copied.stats().balanced());
        assert!(aliased.stats().balanced());
        assert_eq!(copied.stats().commits, 0);
    }

    #[test]
    fn test_string_display_and_new() {
        let text = HostString::from("héllo");
        assert_eq!(text.to_string(), "héllo");
        let made = text.new_string(&[0x6F, 0x6B]);
        assert_eq!(made.to_string(), "ok");
        assert_eq!(made, HostString::from("ok"));
    }
}
