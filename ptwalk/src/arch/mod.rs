//! Architecture-specific types and constants for the page table walker.

cfg_if::cfg_if! {
    if #[cfg(feature = "i386")] {
        pub mod i386;
        use i386 as arch_impl;
    }
}

pub use arch_impl::{
    ADDRESS_BITS, ADDRESS_MASK, ENTRY_COUNT, FLAGS_MASK, PAGE_OFFSET_BITS, PAGE_SIZE,
    PAGING_LEVELS, PageTableFlags, TABLE_INDEX_BITS,
};

/// Physical address of the selected architecture.
pub type PhysAddr = arch_impl::PhysAddr;
/// Virtual address of the selected architecture.
pub type VirtAddr = arch_impl::VirtAddr;
