//! Page table entries as the MMU stores them.

use core::fmt;

use crate::{
    arch::{ADDRESS_MASK, FLAGS_MASK, PageTableFlags},
    paging::PhysAddr,
};

/// A single page directory or page table entry.
///
/// Both levels share a layout: the low 12 bits are flags and the high 20 bits are a page aligned
/// physical base. For a directory entry the base is a page table, for a table entry it's a page frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct PageTableEntry(u32);

impl PageTableEntry {
    /// An entry with every bit clear.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wraps a raw entry value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Builds an entry from a physical base and a set of flags. The low bits of `addr` are discarded.
    pub const fn new(addr: PhysAddr, flags: PageTableFlags) -> Self {
        Self((addr.as_u32() & ADDRESS_MASK) | flags.bits())
    }

    /// The raw entry value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns true if every bit is clear.
    pub const fn is_unused(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the present bit is set. Nothing else is checked, an entry of just `PRESENT` counts.
    pub const fn is_present(self) -> bool {
        self.flags().contains(PageTableFlags::PRESENT)
    }

    /// The decoded flags. See [`PageTableFlags::decode`].
    pub const fn flags(self) -> PageTableFlags {
        PageTableFlags::decode(self.0)
    }

    /// Every bit below the address field, including the software-available ones (`PTE_FLAGS`).
    pub const fn flag_bits(self) -> u32 {
        self.0 & FLAGS_MASK
    }

    /// The page aligned physical base (`PTE_ADDR`).
    pub const fn addr(self) -> PhysAddr {
        PhysAddr::new(self.0 & ADDRESS_MASK)
    }
}

impl fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTableEntry")
            .field("addr", &self.addr())
            .field("flags", &self.flags())
            .finish()
    }
}

impl fmt::LowerHex for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_fields() {
        let entry = PageTableEntry::from_raw(0x0dfb_f027);
        assert_eq!(entry.addr(), PhysAddr::new(0x0dfb_f000));
        assert_eq!(entry.flag_bits(), 0x027);
        assert!(entry.is_present());
        assert!(entry.flags().contains(PageTableFlags::USER_ACCESSIBLE));
        assert!(!entry.flags().contains(PageTableFlags::DIRTY));
    }

    #[test]
    fn test_new_masks_address() {
        let entry = PageTableEntry::new(PhysAddr::new(0x1234_5678), PageTableFlags::PRESENT);
        assert_eq!(entry.raw(), 0x1234_5001);
    }

    #[test]
    fn test_present_only_entry() {
        let entry = PageTableEntry::from_raw(1);
        assert!(entry.is_present());
        assert_eq!(entry.addr(), PhysAddr::NULL);
        assert!(!PageTableEntry::empty().is_present());
        assert!(PageTableEntry::empty().is_unused());
    }

    #[test]
    fn test_available_bits_kept_in_flag_bits() {
        let entry = PageTableEntry::from_raw(0x0000_2e01);
        assert_eq!(entry.flag_bits(), 0xe01);
        assert_eq!(entry.flags(), PageTableFlags::PRESENT);
    }
}
