//! Architecture-specific types and constants for 32-bit x86 (non-PAE) paging.

pub mod addr;

use bitflags::bitflags;

pub use addr::{PhysAddr, VirtAddr};

/// The width of both virtual and physical addresses in bits.
pub const ADDRESS_BITS: u32 = 32;
/// The number of low address bits that select a byte within a page.
pub const PAGE_OFFSET_BITS: u32 = 12;
/// The number of bits used for indexing into page tables at each level.
pub const TABLE_INDEX_BITS: u32 = 10;
/// The number of table levels below CR3. The directory is level 1, the page tables are level 0.
pub const PAGING_LEVELS: usize = 2;
/// The size of a page in bytes.
pub const PAGE_SIZE: u32 = 1 << PAGE_OFFSET_BITS;
/// The size of a page table (or the page directory) in bytes.
pub const TABLE_SIZE: usize = 4096;
/// The number of entries in a page table (and in the page directory).
pub const ENTRY_COUNT: usize = TABLE_SIZE / core::mem::size_of::<u32>();
/// Bits of an entry that hold flags rather than the physical base.
pub const FLAGS_MASK: u32 = PAGE_SIZE - 1;
/// Bits of an entry that hold the page aligned physical base.
pub const ADDRESS_MASK: u32 = !FLAGS_MASK;

const _: () = assert!(ENTRY_COUNT == 1 << TABLE_INDEX_BITS);
const _: () = assert!(
    PAGING_LEVELS as u32 * TABLE_INDEX_BITS + PAGE_OFFSET_BITS == ADDRESS_BITS,
    "index and offset widths must cover the whole address"
);

bitflags! {
    /// Page directory / page table entry flags for 32-bit x86.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct PageTableFlags: u32 {
        /// The page is present in memory.
        const PRESENT         = 1 << 0;
        /// The page is writable.
        const WRITABLE        = 1 << 1;
        /// The page is accessible from userspace.
        const USER_ACCESSIBLE = 1 << 2;
        /// Write-through caching enabled.
        const WRITE_THROUGH   = 1 << 3;
        /// Cache disabled for this page.
        const NO_CACHE        = 1 << 4;
        /// The page has been accessed.
        const ACCESSED        = 1 << 5;
        /// The page has been written to.
        const DIRTY           = 1 << 6;
        /// In a directory entry, this maps a 4MiB page instead of a page table.
        const HUGE_PAGE       = 1 << 7;
        /// The page is global and not flushed from TLB on CR3 reload.
        const GLOBAL          = 1 << 8;
    }
}

/// Human readable names for each flag, in bit order.
const FLAG_LABELS: [(PageTableFlags, &str); 9] = [
    (PageTableFlags::PRESENT, "present"),
    (PageTableFlags::WRITABLE, "writable"),
    (PageTableFlags::USER_ACCESSIBLE, "user"),
    (PageTableFlags::WRITE_THROUGH, "write-through"),
    (PageTableFlags::NO_CACHE, "cache-disable"),
    (PageTableFlags::ACCESSED, "accessed"),
    (PageTableFlags::DIRTY, "dirty"),
    (PageTableFlags::HUGE_PAGE, "page size"),
    (PageTableFlags::GLOBAL, "global"),
];

impl PageTableFlags {
    /// The bits xv6 calls `PTE_MBZ`. Any of these set in a table entry pointing at a 4KiB page is suspicious.
    pub const MUST_BE_ZERO: Self = Self::HUGE_PAGE.union(Self::GLOBAL);

    /// Decodes the flag bits of a raw entry. Software-available bits are dropped.
    pub const fn decode(raw: u32) -> Self {
        Self::from_bits_truncate(raw & FLAGS_MASK)
    }

    /// Returns the label of a single flag, or `None` if `self` is not exactly one flag.
    pub fn label(self) -> Option<&'static str> {
        FLAG_LABELS
            .iter()
            .find(|(flag, _)| *flag == self)
            .map(|(_, label)| *label)
    }

    /// Iterates the labels of every flag in this set, lowest bit first.
    pub fn labels(self) -> impl Iterator<Item = &'static str> {
        self.iter().filter_map(Self::label)
    }

    /// Returns true if any of the [`PageTableFlags::MUST_BE_ZERO`] bits are set.
    pub const fn has_must_be_zero(self) -> bool {
        self.intersects(Self::MUST_BE_ZERO)
    }
}
