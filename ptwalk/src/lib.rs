//! ptwalk - read-only page table introspection for two-level 32-bit paging.
//!
//! Everything goes through an [`AddressSpace`], which borrows a page directory and a
//! [`PhysMapper`](paging::PhysMapper) to reach the tables under it. From there an address can be
//! translated step by step ([`AddressSpace::walk`]) or the whole hierarchy counted region by
//! region ([`AddressSpace::scan`]). Nothing here ever writes to a page table.
#![cfg_attr(not(test), no_std)]

#[cfg(not(feature = "i386"))]
compile_error!("Only i386 two-level paging is currently supported.");

pub mod arch;
pub mod layout;
pub mod paging;

mod dump;
mod error;
mod scan;
mod space;
mod walk;

pub use dump::{DumpMode, DumpReport};
pub use error::DumpError;
pub use layout::{MemoryLayout, Region, RegionMap};
pub use scan::{FreeSummary, ScanEvent, ScanSummary};
pub use space::AddressSpace;
pub use walk::{TranslationTrace, WalkStep};

#[cfg(test)]
mod test_util {
    //! Host side physical memory for tests.
    use crate::{
        AddressSpace, RegionMap,
        arch::{PAGE_SIZE, PageTableFlags},
        paging::{DirectMapping, PageTable, PageTableEntry, PageTableIndex, PhysAddr, PhysMapper},
    };

    /// The flags a user page gets from xv6's `mappages`.
    pub fn user_flags() -> PageTableFlags {
        PageTableFlags::PRESENT | PageTableFlags::WRITABLE | PageTableFlags::USER_ACCESSIBLE
    }

    /// A fixed number of zeroed frames, with physical address 0 at the first one.
    ///
    /// Frame 0 is never handed out so a zero base still lands somewhere readable, and frame 1 is
    /// the page directory. Anything past the last frame is unreachable.
    pub struct TestMemory {
        frames: Vec<PageTable>,
        next: usize,
    }

    impl TestMemory {
        pub fn new(count: usize) -> Self {
            assert!(count >= 2, "need at least a reserved frame and a directory");
            Self {
                frames: vec![PageTable::new(); count],
                next: 2,
            }
        }

        // Taken fresh from `&self` on every read, so writes through `&mut self` never leave a
        // stale pointer behind.
        fn mapping(&self) -> DirectMapping {
            // SAFETY: The mapping only lives for the `&self` borrow it came from, so `frames` can't
            // move or be written while it is in use. Reads past the end are filtered by `frame`.
            unsafe { DirectMapping::new(self.frames.as_ptr() as u64) }
        }

        pub fn root(&self) -> PhysAddr {
            PhysAddr::new(PAGE_SIZE)
        }

        pub fn space(&self) -> AddressSpace<'_, Self> {
            AddressSpace::new(self.root(), self).unwrap()
        }

        pub fn space_with(&self, regions: RegionMap) -> AddressSpace<'_, Self> {
            AddressSpace::with_regions(self.root(), self, regions).unwrap()
        }

        pub fn alloc_frame(&mut self) -> PhysAddr {
            assert!(self.next < self.frames.len(), "out of test frames");
            let addr = PhysAddr::new(self.next as u32 * PAGE_SIZE);
            self.next += 1;
            addr
        }

        /// Allocates a table and points directory slot `index` at it.
        pub fn add_table(&mut self, index: PageTableIndex, flags: PageTableFlags) -> PhysAddr {
            let table = self.alloc_frame();
            self.set(self.root(), index, PageTableEntry::new(table, flags));
            table
        }

        pub fn map(
            &mut self,
            table: PhysAddr,
            index: PageTableIndex,
            page: PhysAddr,
            flags: PageTableFlags,
        ) {
            self.set(table, index, PageTableEntry::new(page, flags));
        }

        pub fn set(&mut self, table: PhysAddr, index: PageTableIndex, entry: PageTableEntry) {
            let frame = self.frame(table).expect("table outside test memory");
            self.frames[frame][index] = entry;
        }

        pub fn write_byte(&mut self, addr: PhysAddr, value: u8) {
            let len = self.frames.len() * PAGE_SIZE as usize;
            // SAFETY: `frames` is `len` bytes of plain integers, borrowed mutably for this call.
            let bytes =
                unsafe { std::slice::from_raw_parts_mut(self.frames.as_mut_ptr().cast::<u8>(), len) };
            bytes[addr.as_u32() as usize] = value;
        }

        /// Every raw entry in every frame.
        pub fn snapshot(&self) -> Vec<u32> {
            self.frames
                .iter()
                .flat_map(|table| table.iter().map(|(_, entry)| entry.raw()))
                .collect()
        }

        fn frame(&self, addr: PhysAddr) -> Option<usize> {
            let frame = (addr.as_u32() / PAGE_SIZE) as usize;
            (frame < self.frames.len()).then_some(frame)
        }
    }

    impl PhysMapper for TestMemory {
        fn table(&self, base: PhysAddr) -> Option<&PageTable> {
            self.frame(base).map(|f| &self.frames[f])
        }

        fn read_byte(&self, addr: PhysAddr) -> Option<u8> {
            self.frame(addr)?;
            self.mapping().read_byte(addr)
        }
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = TestMemory::new(3);
        let frame = mem.alloc_frame();
        assert_eq!(frame, PhysAddr::new(0x2000));
        mem.write_byte(PhysAddr::new(0x2fff), 0xee);
        assert_eq!(mem.read_byte(PhysAddr::new(0x2fff)), Some(0xee));
        assert_eq!(mem.read_byte(PhysAddr::new(0x3000)), None);
        assert!(mem.table(PhysAddr::new(0x3000)).is_none());
        assert!(mem.table(mem.root()).is_some());
    }

    #[test]
    fn test_memory_reads_see_later_writes() {
        let mut mem = TestMemory::new(4);
        assert_eq!(mem.space().scan().unwrap().directories(), 0);

        let table = mem.add_table(PageTableIndex::new(0), user_flags());
        let page = mem.alloc_frame();
        mem.map(table, PageTableIndex::new(5), page, user_flags());
        let byte = PhysAddr::new(page.as_u32() + 7);
        mem.write_byte(byte, 0x5a);

        let entry = mem.table(table).unwrap()[PageTableIndex::new(5)];
        assert_eq!(entry.addr(), page);
        assert_eq!(mem.read_byte(byte), Some(0x5a));
        assert_eq!(mem.space().scan().unwrap().pages(), 1);
    }
}

#[cfg(test)]
mod log_internal {
    use ctor::ctor;

    #[ctor]
    static INIT: () = {
        env_logger::builder().is_test(true).init();
    };
}
