//! Access to page tables by physical address.

use crate::{
    arch::PAGE_SIZE,
    paging::{PageTable, PhysAddr},
};

/// Turns physical addresses found in paging entries into something the walker can read.
///
/// This stands in for the kernel's physical-to-virtual translation (`P2V` on xv6). Implementations
/// only ever hand out shared references; the walker never writes through them.
pub trait PhysMapper {
    /// Returns the page table whose first byte is at `base`, or `None` if that frame can't be reached.
    /// `base` is always page aligned.
    fn table(&self, base: PhysAddr) -> Option<&PageTable>;

    /// Reads a single byte of physical memory, or `None` if it can't be reached.
    fn read_byte(&self, addr: PhysAddr) -> Option<u8>;
}

impl<M: PhysMapper + ?Sized> PhysMapper for &M {
    fn table(&self, base: PhysAddr) -> Option<&PageTable> {
        (**self).table(base)
    }

    fn read_byte(&self, addr: PhysAddr) -> Option<u8> {
        (**self).read_byte(addr)
    }
}

/// A direct mapping, where all physical memory is mapped at a fixed offset in the virtual address space.
/// This is the higher half layout xv6 uses (`KERNBASE`) and what the HHDM gives a limine kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectMapping {
    offset: u64,
}

impl DirectMapping {
    /// Creates a new direct mapping with physical memory starting at `offset`.
    ///
    /// # Safety
    /// For every physical address read through this mapping (the root, every table base reachable from
    /// it and any byte passed to `read_byte`) `offset + addr` must be readable memory of the current
    /// address space for as long as this mapping is used, and must not be written to while a walk or
    /// scan is running.
    ///
    /// # Panics
    /// If `offset` is not page aligned.
    pub const unsafe fn new(offset: u64) -> Self {
        assert!(offset % PAGE_SIZE as u64 == 0, "direct mapping offset must be page aligned");
        Self { offset }
    }

    /// The virtual address physical address 0 is mapped at.
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    fn virt(&self, addr: PhysAddr) -> Option<usize> {
        usize::try_from(self.offset.checked_add(addr.as_u64())?).ok()
    }
}

impl PhysMapper for DirectMapping {
    fn table(&self, base: PhysAddr) -> Option<&PageTable> {
        debug_assert!(base.is_page_aligned());
        let virt = self.virt(base)?;
        // SAFETY: The creator of the mapping promised this range is readable and not being mutated.
        // Both `offset` and `base` are page aligned, so the pointer is aligned for `PageTable`.
        Some(unsafe { &*(virt as *const PageTable) })
    }

    fn read_byte(&self, addr: PhysAddr) -> Option<u8> {
        let virt = self.virt(addr)?;
        // SAFETY: Same contract as `table`. Volatile so the read actually hits memory (it may be MMIO).
        Some(unsafe { core::ptr::read_volatile(virt as *const u8) })
    }
}
