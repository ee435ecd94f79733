//! Translating a single virtual address, keeping every entry looked at along the way.

use arrayvec::ArrayVec;
use log::{trace, warn};

use crate::{
    AddressSpace, DumpError,
    arch::{PAGING_LEVELS, PageTableFlags},
    paging::{
        DecomposedAddr, PageTableEntry, PageTableIndex, PhysAddr, PhysMapper, VirtAddr, decompose,
    },
};

/// One entry read during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStep {
    /// Physical address of the table the entry was read from.
    pub table: PhysAddr,
    /// Slot that was read.
    pub index: PageTableIndex,
    /// The entry itself.
    pub entry: PageTableEntry,
}

impl WalkStep {
    /// The flags of the entry.
    pub const fn flags(&self) -> PageTableFlags {
        self.entry.flags()
    }

    /// Returns true if the entry is present.
    pub const fn is_present(&self) -> bool {
        self.entry.is_present()
    }
}

/// The record of a walk.
///
/// The directory step is always there. The table step is only there if the directory entry was
/// present, and the physical address only if both were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTrace {
    addr: VirtAddr,
    // Highest level first, so the directory is always at index 0.
    steps: ArrayVec<WalkStep, PAGING_LEVELS>,
    physical: Option<PhysAddr>,
}

impl TranslationTrace {
    /// The address that was translated.
    pub const fn addr(&self) -> VirtAddr {
        self.addr
    }

    /// The address split into its fields.
    pub const fn parts(&self) -> DecomposedAddr {
        decompose(self.addr)
    }

    /// The page directory entry.
    pub fn directory(&self) -> &WalkStep {
        // A trace is never built without reading the directory.
        &self.steps[0]
    }

    /// The page table entry, if the directory entry pointed at a table.
    pub fn table(&self) -> Option<&WalkStep> {
        self.steps.get(PAGING_LEVELS - 1)
    }

    /// Every step taken, directory first.
    pub fn steps(&self) -> &[WalkStep] {
        &self.steps
    }

    /// The translated physical address, if the address is mapped.
    pub const fn physical(&self) -> Option<PhysAddr> {
        self.physical
    }

    /// Returns true if the address translated all the way to a physical address.
    pub const fn is_mapped(&self) -> bool {
        self.physical.is_some()
    }
}

impl<M: PhysMapper> AddressSpace<'_, M> {
    /// Walks the paging structures for `addr`.
    ///
    /// Missing entries are not an error, the trace simply stops where the walk did. An error is only
    /// returned when a present directory entry points at a table the mapper can't reach.
    pub fn walk(&self, addr: VirtAddr) -> Result<TranslationTrace, DumpError> {
        let offset = addr.page_offset();
        let mut steps = ArrayVec::new();
        let mut table = self.root();
        let mut table_addr = self.root_addr();

        for level in (0..PAGING_LEVELS).rev() {
            let index = addr.table_index(level);
            let entry = table[index];
            trace!(
                "walk {:#x}: level {} slot {} of {:#x} = {:#x} ({:?})",
                addr,
                level,
                index.value(),
                table_addr,
                entry,
                entry.flags()
            );
            steps.push(WalkStep {
                table: table_addr,
                index,
                entry,
            });

            if !entry.is_present() {
                break;
            }

            if level == 0 {
                return Ok(TranslationTrace {
                    addr,
                    steps,
                    physical: Some(entry.addr().with_offset(offset)),
                });
            }

            table_addr = entry.addr();
            table = self.mapper().table(table_addr).ok_or_else(|| {
                warn!("walk {:#x}: page table at {:#x} is not accessible", addr, table_addr);
                DumpError::InaccessibleTable {
                    table: table_addr,
                    slot: index.value(),
                }
            })?;
        }

        Ok(TranslationTrace {
            addr,
            steps,
            physical: None,
        })
    }

    /// Reads the byte `trace` resolved to. `None` if the address wasn't mapped or the mapper can't
    /// reach that frame.
    pub fn read_byte(&self, trace: &TranslationTrace) -> Option<u8> {
        self.mapper().read_byte(trace.physical()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        paging::{PageOffset, compose},
        test_util::{TestMemory, user_flags},
    };

    fn idx(value: u16) -> PageTableIndex {
        PageTableIndex::new(value)
    }

    #[test]
    fn test_unmapped_directory() {
        let mem = TestMemory::new(4);
        let space = mem.space();
        let trace = space.walk(VirtAddr::new(0x0040_1234)).unwrap();

        assert_eq!(trace.directory().index, idx(1));
        assert_eq!(trace.directory().table, mem.root());
        assert!(!trace.directory().is_present());
        assert!(!trace.directory().flags().contains(PageTableFlags::PRESENT));
        assert!(trace.table().is_none());
        assert_eq!(trace.physical(), None);
        assert_eq!(trace.steps().len(), 1);
        assert!(!trace.is_mapped());
    }

    #[test]
    fn test_unmapped_table_entry() {
        let mut mem = TestMemory::new(4);
        let table = mem.add_table(idx(1), user_flags());
        let space = mem.space();
        let trace = space.walk(VirtAddr::new(0x0040_1234)).unwrap();

        assert!(trace.directory().is_present());
        assert_eq!(trace.directory().entry.addr(), table);
        let step = trace.table().expect("table step");
        assert_eq!(step.table, table);
        assert_eq!(step.index, idx(1));
        assert!(!step.is_present());
        assert_eq!(trace.physical(), None);
    }

    #[test]
    fn test_fully_mapped() {
        let mut mem = TestMemory::new(4);
        let (d, t, o) = (idx(1), idx(0x3ff), PageOffset::new(0x9ab));
        let table = mem.add_table(d, user_flags());
        let page = PhysAddr::new(0x0dfb_f000);
        mem.map(table, t, page, user_flags() | PageTableFlags::DIRTY);

        let space = mem.space();
        let trace = space.walk(compose(d, t, o)).unwrap();
        assert_eq!(trace.parts().directory, d);
        assert_eq!(trace.parts().table, t);
        assert_eq!(trace.parts().offset, o);
        assert_eq!(trace.physical(), Some(PhysAddr::new(0x0dfb_f9ab)));
        assert!(trace.table().unwrap().flags().contains(PageTableFlags::DIRTY));
    }

    #[test]
    fn test_physical_is_page_base_or_offset() {
        let mut mem = TestMemory::new(4);
        let table = mem.add_table(idx(0), user_flags());
        for (slot, page) in [(0u16, 0x0001_0000u32), (5, 0x0003_c000), (1023, 0xfff0_0000)] {
            mem.map(table, idx(slot), PhysAddr::new(page), user_flags());
        }
        let space = mem.space();

        for (slot, page) in [(0u16, 0x0001_0000u32), (5, 0x0003_c000), (1023, 0xfff0_0000)] {
            for offset in [0u16, 1, 0x800, 0xfff] {
                let addr = compose(idx(0), idx(slot), PageOffset::new(offset));
                let trace = space.walk(addr).unwrap();
                assert_eq!(trace.physical(), Some(PhysAddr::new(page | u32::from(offset))));
            }
        }
    }

    #[test]
    fn test_present_directory_with_zero_base() {
        // Present with every other bit clear points at physical 0. That's still a table.
        let mut mem = TestMemory::new(4);
        mem.set(mem.root(), idx(2), PageTableEntry::from_raw(1));
        let trace = mem.space().walk(VirtAddr::new(0x0080_0000)).unwrap();
        assert!(trace.directory().is_present());
        assert_eq!(trace.table().unwrap().table, PhysAddr::NULL);
    }

    #[test]
    fn test_inaccessible_table() {
        let mut mem = TestMemory::new(4);
        // Far past the end of the test arena.
        let missing = PhysAddr::new(0x4000_0000);
        mem.set(mem.root(), idx(3), PageTableEntry::new(missing, user_flags()));
        let err = mem.space().walk(VirtAddr::new(0x00c0_0000)).unwrap_err();
        assert_eq!(
            err,
            DumpError::InaccessibleTable {
                table: missing,
                slot: 3
            }
        );
    }

    #[test]
    fn test_read_byte() {
        let mut mem = TestMemory::new(4);
        let table = mem.add_table(idx(0), user_flags());
        let page = mem.alloc_frame();
        mem.map(table, idx(7), page, user_flags());
        mem.write_byte(page.with_offset(PageOffset::new(0x10)), 0x5a);

        let space = mem.space();
        let trace = space.walk(VirtAddr::new(0x7010)).unwrap();
        assert_eq!(space.read_byte(&trace), Some(0x5a));

        let unmapped = space.walk(VirtAddr::new(0x8010)).unwrap();
        assert_eq!(space.read_byte(&unmapped), None);
    }

    #[test]
    fn test_walk_does_not_modify_tables() {
        let mut mem = TestMemory::new(4);
        let table = mem.add_table(idx(0), user_flags());
        mem.map(table, idx(1), PhysAddr::new(0x0010_0000), user_flags());
        let before = mem.snapshot();
        let space = mem.space();
        for addr in [0u32, 0x1000, 0x1fff, 0x0040_0000, u32::MAX] {
            space.walk(VirtAddr::new(addr)).unwrap();
        }
        assert_eq!(before, mem.snapshot());
    }
}
