//! Page index and offset types.

use crate::arch::{ENTRY_COUNT, PAGE_SIZE};

/// A index into a page table or the page directory. This value will always be less than the
/// current platform's entry count (1024 for i386).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PageTableIndex(u16);

impl PageTableIndex {
    /// Creates a new `PageTableIndex` from a raw value. The caller must ensure that the value is valid (i.e., less than the entry count for the current architecture).
    ///
    /// # Safety
    /// `value` must be less than [`ENTRY_COUNT`].
    pub const unsafe fn new_unchecked(value: u16) -> Self {
        Self(value)
    }

    /// Creates a new `PageTableIndex` from a raw value, returning `None` if the value is out of bounds.
    pub const fn try_new(value: u16) -> Option<Self> {
        if (value as usize) < ENTRY_COUNT {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Creates a new `PageTableIndex` from a raw value, panicking if the value is out of bounds.
    pub const fn new(value: u16) -> Self {
        Self::try_new(value).expect("PageTableIndex value out of bounds")
    }

    /// Creates a new `PageTableIndex` from the low bits of `value`, discarding the rest.
    pub const fn new_truncate(value: u32) -> Self {
        Self((value as usize % ENTRY_COUNT) as u16)
    }

    /// Returns the raw index value.
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Returns the raw index value as a usize, for indexing slices.
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Iterates every valid index in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..ENTRY_COUNT as u16).map(Self)
    }
}

impl From<PageTableIndex> for usize {
    fn from(index: PageTableIndex) -> Self {
        index.as_usize()
    }
}

/// A byte offset into a page. Always less than [`PAGE_SIZE`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PageOffset(u16);

impl PageOffset {
    /// Creates a new `PageOffset`, returning `None` if the value is not inside a page.
    pub const fn try_new(value: u16) -> Option<Self> {
        if (value as u32) < PAGE_SIZE {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Creates a new `PageOffset`, panicking if the value is not inside a page.
    pub const fn new(value: u16) -> Self {
        Self::try_new(value).expect("PageOffset value out of bounds")
    }

    /// Creates a new `PageOffset` from the low bits of `value`, discarding the rest.
    pub const fn new_truncate(value: u32) -> Self {
        Self((value % PAGE_SIZE) as u16)
    }

    /// Returns the raw offset value.
    pub const fn value(self) -> u16 {
        self.0
    }
}
