//! Access to buffers owned by the host runtime.
//!
//! The host owns every array and string the kernels touch. A call gets a
//! view by *acquiring* the buffer, works on it, and *releases* it exactly
//! once. Depending on the host, the view is either a private copy (changes
//! reach the owner only when committed on release) or a direct alias of
//! the owner's storage (changes are visible immediately).
//!
//! ```text
//! host handle ──acquire──► RawElements { ptr, len, is_copy }
//!                               │
//!                        Elements guard (Deref<[T]>)
//!                               │  kernel reads / writes
//!                        Drop ──release(mode)──► host handle
//! ```
//!
//! [`Elements`] and [`Chars`] are the guards: they acquire on construction
//! and release in `Drop`, so early returns and panics still release once.

use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use tracing::trace;

/// Raw view produced by an acquisition.
///
/// Only meaningful between the acquisition that produced it and the
/// matching release.
#[derive(Debug)]
pub struct RawElements<T> {
    ptr: NonNull<T>,
    len: usize,
    is_copy: bool,
}

impl<T> RawElements<T> {
    /// Wrap a pointer handed out by a host.
    #[must_use]
    pub fn new(ptr: NonNull<T>, len: usize, is_copy: bool) -> Self {
        Self { ptr, len, is_copy }
    }

    /// First element (dangling but non-null when `len == 0`).
    #[must_use]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the view is a private copy rather than an alias.
    #[must_use]
    pub fn is_copy(&self) -> bool {
        self.is_copy
    }
}

/// What happens to a private copy on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Copy the contents back to the owner, then free the copy.
    Commit,
    /// Free the copy without copying back.
    Abort,
}

/// A host-owned array of `Element`s.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - the pointer returned by `acquire` is valid for reads and writes of
///   `len` elements of `Element` until the matching `release`
/// - `is_copy` is `false` only when writes through the pointer land
///   directly in the owner's storage
/// - `release` with [`ReleaseMode::Commit`] makes a copy's contents visible
///   to the owner, and every `release` frees what `acquire` allocated
/// - `acquire` never returns a view overlapping one that is still
///   outstanding; a second `acquire` before the matching `release` must
///   panic instead
///
/// [`Elements`] hands out `&mut [Element]` from safe code, so the last
/// rule is what keeps two guards from aliasing the same memory.
pub unsafe trait ForeignBuffer {
    /// Element type.
    type Element: Copy;

    /// Element count.
    fn len(&self) -> usize;

    /// Whether the buffer holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Obtain a raw view over the elements.
    ///
    /// # Panics
    ///
    /// Panics if a previous view has not been released.
    fn acquire(&self) -> RawElements<Self::Element>;

    /// Give a view back to the owner.
    ///
    /// # Safety
    ///
    /// `raw` must come from `acquire` on this same buffer and must not be
    /// used afterwards.
    unsafe fn release(&self, raw: RawElements<Self::Element>, mode: ReleaseMode);
}

/// A host-owned, immutable UTF-16 string.
///
/// # Safety
///
/// Implementors must guarantee that the pointer returned by
/// `acquire_chars` is valid for reads of `len` code units until the
/// matching `release_chars`, and valid for writes as well when `is_copy`
/// is `true`.
pub unsafe trait ForeignString {
    /// Value the host hands back for a newly constructed string.
    type Output;

    /// Length in UTF-16 code units.
    fn len(&self) -> usize;

    /// Whether the string is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Obtain a raw view over the code units.
    fn acquire_chars(&self) -> RawElements<u16>;

    /// Give a view back to the owner. Strings are never committed.
    ///
    /// # Safety
    ///
    /// `raw` must come from `acquire_chars` on this same string and must
    /// not be used afterwards.
    unsafe fn release_chars(&self, raw: RawElements<u16>);

    /// Construct a new host string from `units`.
    fn new_string(&self, units: &[u16]) -> Self::Output;
}

/// Acquired array view, tagged with how it relates to owner storage.
#[derive(Debug)]
pub enum Acquired<'a, T> {
    /// Private copy; changes reach the owner on commit.
    Owned(&'a mut [T]),
    /// Direct alias; changes are visible to the owner immediately.
    Aliased(&'a mut [T]),
}

impl<'a, T> Acquired<'a, T> {
    /// The elements, whichever way they were acquired.
    pub fn into_slice(self) -> &'a mut [T] {
        match self {
            Acquired::Owned(values) | Acquired::Aliased(values) => values,
        }
    }
}

/// RAII guard over an acquired array.
///
/// Releases with [`ReleaseMode::Commit`] on drop unless
/// [`Elements::discard_changes`] was called.
#[derive(Debug)]
pub struct Elements<'h, B: ForeignBuffer + ?Sized> {
    buffer: &'h B,
    raw: Option<RawElements<B::Element>>,
    mode: ReleaseMode,
}

impl<'h, B: ForeignBuffer + ?Sized> Elements<'h, B> {
    /// Acquire `buffer`.
    pub fn acquire(buffer: &'h B) -> Self {
        let raw = buffer.acquire();
        trace!(len = raw.len(), is_copy = raw.is_copy(), "Acquired foreign elements");
        Self {
            buffer,
            raw: Some(raw),
            mode: ReleaseMode::Commit,
        }
    }

    /// Whether the view is a private copy.
    #[must_use]
    pub fn is_copy(&self) -> bool {
        self.raw.as_ref().is_some_and(RawElements::is_copy)
    }

    /// Release without copying a private copy back to the owner.
    ///
    /// Has no effect on an aliased view, whose writes already landed.
    pub fn discard_changes(&mut self) {
        self.mode = ReleaseMode::Abort;
    }

    /// The view, tagged owned or aliased.
    pub fn acquired(&mut self) -> Acquired<'_, B::Element> {
        let is_copy = self.is_copy();
        let values = &mut **self;
        if is_copy {
            Acquired::Owned(values)
        } else {
            Acquired::Aliased(values)
        }
    }
}

impl<B: ForeignBuffer + ?Sized> Deref for Elements<'_, B> {
    type Target = [B::Element];

    fn deref(&self) -> &[B::Element] {
        match &self.raw {
            // SAFETY: the buffer guarantees `ptr` is valid for `len` elements
            // until release, which only happens in `drop`
            Some(raw) => unsafe { std::slice::from_raw_parts(raw.ptr().as_ptr(), raw.len()) },
            None => &[],
        }
    }
}

impl<B: ForeignBuffer + ?Sized> DerefMut for Elements<'_, B> {
    fn deref_mut(&mut self) -> &mut [B::Element] {
        match &self.raw {
            // SAFETY: as in `deref`; `&mut self` makes this the only live view
            Some(raw) => unsafe {
                std::slice::from_raw_parts_mut(raw.ptr().as_ptr(), raw.len())
            },
            None => &mut [],
        }
    }
}

impl<B: ForeignBuffer + ?Sized> Drop for Elements<'_, B> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            trace!(len = raw.len(), mode = ?self.mode, "Releasing foreign elements");
            // SAFETY: `raw` came from `acquire` on `self.buffer` and is
            // dropped here
            unsafe { self.buffer.release(raw, self.mode) };
        }
    }
}

/// Acquired string view. Aliased views are read-only, so owner storage
/// cannot be mutated through them.
#[derive(Debug)]
pub enum AcquiredChars<'a> {
    /// Private copy, free to mutate.
    Owned(&'a mut [u16]),
    /// Direct view of the owner's immutable code units.
    Aliased(&'a [u16]),
}

/// RAII guard over acquired string code units.
#[derive(Debug)]
pub struct Chars<'h, S: ForeignString + ?Sized> {
    text: &'h S,
    raw: Option<RawElements<u16>>,
}

impl<'h, S: ForeignString + ?Sized> Chars<'h, S> {
    /// Acquire `text`.
    pub fn acquire(text: &'h S) -> Self {
        let raw = text.acquire_chars();
        trace!(len = raw.len(), is_copy = raw.is_copy(), "Acquired foreign chars");
        Self {
            text,
            raw: Some(raw),
        }
    }

    /// Whether the view is a private copy.
    #[must_use]
    pub fn is_copy(&self) -> bool {
        self.raw.as_ref().is_some_and(RawElements::is_copy)
    }

    /// Read-only view of the code units.
    #[must_use]
    pub fn as_slice(&self) -> &[u16] {
        match &self.raw {
            // SAFETY: the string guarantees reads are valid until release
            Some(raw) => unsafe { std::slice::from_raw_parts(raw.ptr().as_ptr(), raw.len()) },
            None => &[],
        }
    }

    /// The view, tagged owned or aliased.
    pub fn acquired(&mut self) -> AcquiredChars<'_> {
        match &self.raw {
            // SAFETY: writes are valid for private copies, and `&mut self`
            // makes this the only live view
            Some(raw) if raw.is_copy() => AcquiredChars::Owned(unsafe {
                std::slice::from_raw_parts_mut(raw.ptr().as_ptr(), raw.len())
            }),
            _ => AcquiredChars::Aliased(self.as_slice()),
        }
    }
}

impl<S: ForeignString + ?Sized> Drop for Chars<'_, S> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            trace!(len = raw.len(), "Releasing foreign chars");
            // SAFETY: `raw` came from `acquire_chars` on `self.text`
            unsafe { self.text.release_chars(raw) };
        }
    }
}
