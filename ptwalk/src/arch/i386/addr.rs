//! Address primitives for 32-bit x86.

use core::fmt;

use super::{ADDRESS_MASK, PAGE_OFFSET_BITS, PAGING_LEVELS, TABLE_INDEX_BITS};
use crate::paging::{PageOffset, PageTableIndex};

// Neither address type has any invalid bit patterns on i386, so the checked constructors only
// exist to catch 64 bit host values that don't fit.

/// Physical address type for 32-bit x86.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysAddr(u32);

impl PhysAddr {
    /// The bit width of physical addresses without PAE.
    pub const BIT_WIDTH: u8 = 32;
    /// The null physical address.
    pub const NULL: PhysAddr = PhysAddr(0);

    /// Create a new physical address from a u32.
    pub const fn new(addr: u32) -> Self {
        PhysAddr(addr)
    }

    /// Create a new physical address from a u64, returning `None` if it does not fit in 32 bits.
    pub const fn try_new(addr: u64) -> Option<Self> {
        if addr > u32::MAX as u64 {
            None
        } else {
            Some(PhysAddr(addr as u32))
        }
    }

    /// Get the underlying u32 value of the physical address.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get the physical address widened to a u64.
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }

    /// Returns true if this is the null address.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the address is on a page boundary.
    pub const fn is_page_aligned(self) -> bool {
        self.0 & !ADDRESS_MASK == 0
    }

    /// Rounds the address down to the start of its page frame.
    pub const fn align_down(self) -> Self {
        PhysAddr(self.0 & ADDRESS_MASK)
    }

    /// The byte offset of this address within its page frame.
    pub const fn page_offset(self) -> PageOffset {
        PageOffset::new_truncate(self.0)
    }

    /// Places `offset` inside the page frame containing this address.
    pub const fn with_offset(self, offset: PageOffset) -> Self {
        PhysAddr(self.align_down().0 | offset.value() as u32)
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#x})", self.0)
    }
}

impl fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Virtual address type for 32-bit x86.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtAddr(u32);

impl VirtAddr {
    /// The bit width of virtual addresses.
    pub const BIT_WIDTH: u8 = 32;
    /// Number of bytes mapped by a single directory entry (4MiB).
    pub const DIRECTORY_SPAN: u64 = 1 << Self::level_shift(PAGING_LEVELS - 1);

    /// Create a new virtual address from a u32.
    pub const fn new(addr: u32) -> Self {
        VirtAddr(addr)
    }

    /// Create a new virtual address from a u64, returning `None` if it does not fit in 32 bits.
    pub const fn try_new(addr: u64) -> Option<Self> {
        if addr > u32::MAX as u64 {
            None
        } else {
            Some(VirtAddr(addr as u32))
        }
    }

    /// Get the underlying u32 value of the virtual address.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get the virtual address widened to a u64.
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }

    /// The shift of the index field for the given table level.
    /// Level 0 is the page table, level `PAGING_LEVELS - 1` is the directory.
    pub const fn level_shift(level: usize) -> u32 {
        assert!(level < PAGING_LEVELS, "paging level out of range");
        PAGE_OFFSET_BITS + level as u32 * TABLE_INDEX_BITS
    }

    /// Returns the index into the table at `level` that this address selects.
    pub const fn table_index(self, level: usize) -> PageTableIndex {
        PageTableIndex::new_truncate(self.0 >> Self::level_shift(level))
    }

    /// Returns the page directory index (bits 22-31).
    pub const fn directory_index(self) -> PageTableIndex {
        self.table_index(PAGING_LEVELS - 1)
    }

    /// Returns the page table index (bits 12-21).
    pub const fn page_table_index(self) -> PageTableIndex {
        self.table_index(0)
    }

    /// Returns the byte offset within the page (bits 0-11).
    pub const fn page_offset(self) -> PageOffset {
        PageOffset::new_truncate(self.0)
    }

    /// Returns the first address mapped by the given directory slot.
    pub const fn from_directory_index(index: PageTableIndex) -> Self {
        VirtAddr((index.value() as u32) << Self::level_shift(PAGING_LEVELS - 1))
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#x})", self.0)
    }
}

impl fmt::LowerHex for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
