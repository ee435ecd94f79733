//! Sparse physical memory on the host, and a builder to lay page tables out in it.

use std::collections::BTreeMap;

use log::{debug, trace};
use ptwalk::{
    AddressSpace, DumpError, MemoryLayout, RegionMap,
    arch::{PAGE_SIZE, PageTableFlags},
    paging::{PageOffset, PageTable, PageTableEntry, PageTableIndex, PhysAddr, PhysMapper, VirtAddr},
};

type Frame = Box<[u8; PAGE_SIZE as usize]>;

/// Physical memory made of whatever frames were put in it. Everything else is unreachable.
///
/// Page tables and data frames are kept apart: a table frame can't be read byte by byte, and a
/// data frame can't be used as a table.
#[derive(Debug, Default, Clone)]
pub struct SimulatedMemory {
    tables: BTreeMap<u32, Box<PageTable>>,
    frames: BTreeMap<u32, Frame>,
}

impl SimulatedMemory {
    /// Creates empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `table` at `base`, replacing whatever table was there.
    ///
    /// # Panics
    /// If `base` is not page aligned.
    pub fn insert_table(&mut self, base: PhysAddr, table: PageTable) {
        assert!(base.is_page_aligned(), "table base {base:#x} is not page aligned");
        self.tables.insert(base.as_u32(), Box::new(table));
    }

    /// Returns true if there is a table at `base`.
    pub fn has_table(&self, base: PhysAddr) -> bool {
        self.tables.contains_key(&base.as_u32())
    }

    /// The table at `base`, for filling in.
    pub fn table_mut(&mut self, base: PhysAddr) -> Option<&mut PageTable> {
        self.tables.get_mut(&base.as_u32()).map(|table| &mut **table)
    }

    /// Copies `data` into physical memory starting at `addr`, creating zeroed frames as needed.
    /// Stops at the top of the address space.
    pub fn write_bytes(&mut self, addr: PhysAddr, data: &[u8]) {
        for (addr, byte) in (addr.as_u32()..=u32::MAX).zip(data) {
            let addr = PhysAddr::new(addr);
            let frame = self
                .frames
                .entry(addr.align_down().as_u32())
                .or_insert_with(|| Box::new([0; PAGE_SIZE as usize]));
            frame[usize::from(addr.page_offset().value())] = *byte;
        }
    }

    /// Number of page tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Number of data frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl PhysMapper for SimulatedMemory {
    fn table(&self, base: PhysAddr) -> Option<&PageTable> {
        self.tables.get(&base.as_u32()).map(|table| &**table)
    }

    fn read_byte(&self, addr: PhysAddr) -> Option<u8> {
        let frame = self.frames.get(&addr.align_down().as_u32())?;
        Some(frame[usize::from(addr.page_offset().value())])
    }
}

/// A page directory and everything it points at, ready to be dumped.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Physical memory holding the tables.
    pub memory: SimulatedMemory,
    /// Physical address of the page directory.
    pub root: PhysAddr,
    /// Where the kernel regions are.
    pub layout: MemoryLayout,
}

impl Snapshot {
    /// Opens the snapshot's address space.
    pub fn space(&self) -> Result<AddressSpace<'_, SimulatedMemory>, DumpError> {
        AddressSpace::with_regions(self.root, &self.memory, RegionMap::new(&self.layout))
    }
}

/// Builds a snapshot the way xv6's `mappages` fills a page directory.
#[derive(Debug)]
pub struct AddressSpaceBuilder {
    memory: SimulatedMemory,
    root: PhysAddr,
    next_frame: u32,
    layout: MemoryLayout,
}

impl AddressSpaceBuilder {
    /// Flags every page directory entry gets, like `walkpgdir` does.
    pub const DIRECTORY_FLAGS: PageTableFlags = PageTableFlags::PRESENT
        .union(PageTableFlags::WRITABLE)
        .union(PageTableFlags::USER_ACCESSIBLE);

    /// Creates a builder that hands out frames from `first_frame` upwards. The page directory
    /// takes the first one.
    ///
    /// # Panics
    /// If `first_frame` is null or not page aligned.
    pub fn new(first_frame: PhysAddr, layout: MemoryLayout) -> Self {
        assert!(
            !first_frame.is_null() && first_frame.is_page_aligned(),
            "first frame must be a non null page address"
        );
        let mut builder = Self {
            memory: SimulatedMemory::new(),
            root: first_frame,
            next_frame: first_frame.as_u32(),
            layout,
        };
        let root = builder.alloc_frame();
        builder.memory.insert_table(root, PageTable::new());
        debug!("Creating page directory at {:#x}", root);
        builder
    }

    /// Physical address of the page directory.
    pub fn root(&self) -> PhysAddr {
        self.root
    }

    /// Returns the next free frame.
    ///
    /// # Panics
    /// If the top of physical memory is reached.
    pub fn alloc_frame(&mut self) -> PhysAddr {
        let frame = PhysAddr::new(self.next_frame);
        self.next_frame = self
            .next_frame
            .checked_add(PAGE_SIZE)
            .expect("No more frames available");
        frame
    }

    fn get_or_create_table(&mut self, index: PageTableIndex) -> PhysAddr {
        let entry = self.directory()[index];
        if entry.is_present() {
            return entry.addr();
        }

        let table = self.alloc_frame();
        self.memory.insert_table(table, PageTable::new());
        self.directory_mut()[index] = PageTableEntry::new(table, Self::DIRECTORY_FLAGS);
        trace!("Created page table {:#x} for directory slot {}", table, index.value());
        table
    }

    fn directory(&self) -> &PageTable {
        self.memory.table(self.root).expect("page directory is always present")
    }

    fn directory_mut(&mut self) -> &mut PageTable {
        self.memory.table_mut(self.root).expect("page directory is always present")
    }

    /// Maps the page holding `page` to `frame`. `PRESENT` is always added to `flags`.
    pub fn map_page(&mut self, page: VirtAddr, frame: PhysAddr, flags: PageTableFlags) {
        let table = self.get_or_create_table(page.directory_index());
        let entry = PageTableEntry::new(frame.align_down(), flags | PageTableFlags::PRESENT);
        self.memory
            .table_mut(table)
            .expect("table was just created")[page.page_table_index()] = entry;
    }

    /// Maps `size` bytes starting at `virt` to physical memory starting at `phys`, one page at a
    /// time. `virt` and `phys` don't have to be aligned, every page touched by the range is mapped.
    /// A range running past the top of the address space stops at the last page.
    pub fn map_range(&mut self, virt: VirtAddr, phys: PhysAddr, size: u32, flags: PageTableFlags) {
        if size == 0 {
            return;
        }
        let end = (u64::from(virt.as_u32()) + u64::from(size) - 1).min(u64::from(u32::MAX));
        let first = u64::from(virt.as_u32()) & !(u64::from(PAGE_SIZE) - 1);
        let last = end & !(u64::from(PAGE_SIZE) - 1);
        let pages = (last - first) / u64::from(PAGE_SIZE) + 1;
        debug!("Mapping {:#x}+{:#x} to {:#x} ({} pages)", virt, size, phys, pages);

        let mut page = VirtAddr::new(first as u32);
        let mut frame = phys.align_down();
        for i in 0..pages {
            self.map_page(page, frame, flags);
            if i + 1 < pages {
                page = VirtAddr::new(page.as_u32() + PAGE_SIZE);
                frame = PhysAddr::new(frame.as_u32().wrapping_add(PAGE_SIZE));
            }
        }
    }

    /// Clears `USER_ACCESSIBLE` on the page holding `page`, like xv6's `clearpteu`.
    ///
    /// # Panics
    /// If the page isn't mapped.
    pub fn clear_user(&mut self, page: VirtAddr) {
        let table = self.directory()[page.directory_index()];
        assert!(table.is_present(), "{page:#x} has no page table");
        let table = self
            .memory
            .table_mut(table.addr())
            .expect("present tables are always allocated");
        let entry = &mut table[page.page_table_index()];
        *entry = PageTableEntry::new(entry.addr(), entry.flags() - PageTableFlags::USER_ACCESSIBLE);
    }

    /// Allocates a frame, maps `page` to it and copies `data` to its start.
    pub fn map_data(&mut self, page: VirtAddr, data: &[u8], flags: PageTableFlags) -> PhysAddr {
        let frame = self.alloc_frame();
        self.map_page(page, frame, flags);
        self.write_bytes(frame.with_offset(PageOffset::new(0)), data);
        frame
    }

    /// See [`SimulatedMemory::write_bytes`].
    pub fn write_bytes(&mut self, addr: PhysAddr, data: &[u8]) {
        self.memory.write_bytes(addr, data);
    }

    /// Finishes the address space.
    pub fn build(self) -> Snapshot {
        debug!(
            "Built address space at {:#x}: {} tables, {} data frames",
            self.root,
            self.memory.table_count(),
            self.memory.frame_count()
        );
        Snapshot {
            memory: self.memory,
            root: self.root,
            layout: self.layout,
        }
    }
}
