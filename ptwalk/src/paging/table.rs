//! The page table and page directory layout.

use core::{
    fmt,
    ops::{Index, IndexMut},
};

use crate::{
    arch::ENTRY_COUNT,
    paging::{PageTableEntry, PageTableIndex},
};

/// A page table, laid out exactly the way the MMU reads it. The page directory uses the same type.
#[derive(Clone)]
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageTableEntry; ENTRY_COUNT],
}

const _: () = assert!(
    size_of::<PageTable>() == 4096,
    "PageTable must be exactly 4096 bytes"
);

/// The top-level table. Same layout as a page table.
pub type PageDirectory = PageTable;

impl PageTable {
    /// Creates a table with every entry clear.
    pub const fn new() -> Self {
        Self {
            entries: [PageTableEntry::empty(); ENTRY_COUNT],
        }
    }

    /// Returns the entry at `index`.
    pub fn entry(&self, index: PageTableIndex) -> PageTableEntry {
        self.entries[index.as_usize()]
    }

    /// Iterates every slot along with its index.
    pub fn iter(&self) -> impl Iterator<Item = (PageTableIndex, PageTableEntry)> + '_ {
        PageTableIndex::all().zip(self.entries.iter().copied())
    }

    /// Iterates only the slots with the present bit set.
    pub fn present(&self) -> impl Iterator<Item = (PageTableIndex, PageTableEntry)> + '_ {
        self.iter().filter(|(_, entry)| entry.is_present())
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<PageTableIndex> for PageTable {
    type Output = PageTableEntry;

    fn index(&self, index: PageTableIndex) -> &Self::Output {
        &self.entries[index.as_usize()]
    }
}

// Only table builders (tests, the host side simulator) write entries, the walker never does.
impl IndexMut<PageTableIndex> for PageTable {
    fn index_mut(&mut self, index: PageTableIndex) -> &mut Self::Output {
        &mut self.entries[index.as_usize()]
    }
}

impl fmt::Debug for PageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.present().map(|(index, entry)| (index.value(), entry)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arch::PageTableFlags, paging::PhysAddr};

    #[test]
    fn test_new_table_is_empty() {
        let table = PageTable::new();
        assert_eq!(table.iter().count(), ENTRY_COUNT);
        assert!(table.iter().all(|(_, entry)| entry.is_unused()));
        assert_eq!(table.present().count(), 0);
    }

    #[test]
    fn test_present_skips_non_present() {
        let mut table = PageTable::new();
        let flags = PageTableFlags::PRESENT | PageTableFlags::WRITABLE;
        table[PageTableIndex::new(3)] = PageTableEntry::new(PhysAddr::new(0x5000), flags);
        // Non-zero but not present.
        table[PageTableIndex::new(4)] = PageTableEntry::from_raw(0x6002);

        let present: Vec<_> = table.present().map(|(index, _)| index.value()).collect();
        assert_eq!(present, [3]);
        assert_eq!(table.entry(PageTableIndex::new(3)).addr(), PhysAddr::new(0x5000));
    }
}
