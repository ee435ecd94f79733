//! The fixed virtual memory layout and the directory slot regions derived from it.

use core::ops::Range;

use crate::{
    arch::{ADDRESS_BITS, ENTRY_COUNT},
    paging::{PageTableIndex, VirtAddr},
};

/// The number of regions a directory is split into.
pub const REGION_COUNT: usize = 5;

/// The layout constants that decide where each region starts. These come from the kernel's
/// `memlayout.h`, they are never computed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryLayout {
    /// First kernel virtual address. Everything below belongs to the user.
    pub kernel_base: u32,
    /// Size of the low physical memory (I/O space) mapped right at `kernel_base`.
    pub extmem: u32,
    /// Top of physical memory, mapped at `kernel_base + phystop`.
    pub phystop: u32,
    /// Start of the memory mapped device window at the top of the address space.
    pub devspace: u32,
}

impl MemoryLayout {
    /// xv6's layout.
    pub const XV6: MemoryLayout = MemoryLayout {
        kernel_base: 0x8000_0000,
        extmem: 0x0010_0000,
        phystop: 0x0E00_0000,
        devspace: 0xFE00_0000,
    };

    /// The start address of every region, followed by the end of the address space.
    pub const fn boundaries(&self) -> [u64; REGION_COUNT + 1] {
        let kernel_base = self.kernel_base as u64;
        [
            0,
            kernel_base,
            kernel_base + self.extmem as u64,
            kernel_base + self.phystop as u64,
            self.devspace as u64,
            1 << ADDRESS_BITS,
        ]
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self::XV6
    }
}

/// A contiguous band of directory slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    /// `0` to `KERNBASE`: the process itself.
    User,
    /// `KERNBASE` to `KERNBASE+EXTMEM`: low physical memory and I/O space.
    IoSpace,
    /// `KERNBASE+EXTMEM` to `KERNBASE+PHYSTOP`: kernel text, data and the rest of physical memory.
    KernelMemory,
    /// `KERNBASE+PHYSTOP` to `DEVSPACE`: normally unmapped.
    Unmapped,
    /// `DEVSPACE` to the top of the address space: memory mapped devices.
    Device,
}

impl Region {
    /// Every region, lowest first.
    pub const ALL: [Region; REGION_COUNT] = [
        Region::User,
        Region::IoSpace,
        Region::KernelMemory,
        Region::Unmapped,
        Region::Device,
    ];

    /// Position of this region in [`Region::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The symbolic names of the addresses this region starts and ends at.
    pub const fn bounds_label(self) -> (&'static str, &'static str) {
        match self {
            Region::User => ("0x00000000", "KERNBASE"),
            Region::IoSpace => ("KERNBASE", "KERNBASE+EXTMEM"),
            Region::KernelMemory => ("KERNBASE+EXTMEM", "KERNBASE+PHYSTOP"),
            Region::Unmapped => ("KERNBASE+PHYSTOP", "DEVSPACE"),
            Region::Device => ("DEVSPACE", "0xFFFFFFFF"),
        }
    }
}

/// Maps directory slots to regions.
///
/// Region `k` owns the slots whose 4MiB window starts at or after boundary `k`, so a boundary that
/// isn't 4MiB aligned puts the straddling slot in the region below it. For xv6 this gives
/// `0..512`, `512..513`, `513..568`, `568..1016` and `1016..1024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionMap {
    slots: [u16; REGION_COUNT + 1],
    addrs: [u64; REGION_COUNT + 1],
}

impl RegionMap {
    /// The region map for [`MemoryLayout::XV6`].
    pub const XV6: RegionMap = RegionMap::new(&MemoryLayout::XV6);

    /// Derives the region map from `layout`.
    ///
    /// # Panics
    /// If the layout's boundaries are out of order or run past the end of the address space. A map
    /// built from such a layout would not cover every directory slot exactly once.
    pub const fn new(layout: &MemoryLayout) -> Self {
        let addrs = layout.boundaries();
        let mut slots = [0u16; REGION_COUNT + 1];

        let mut i = 0;
        while i < addrs.len() {
            assert!(
                addrs[i] <= 1 << ADDRESS_BITS,
                "memory layout boundary is outside the address space"
            );
            slots[i] = addrs[i].div_ceil(VirtAddr::DIRECTORY_SPAN) as u16;
            if i > 0 {
                assert!(addrs[i - 1] <= addrs[i], "memory layout boundaries are out of order");
            }
            i += 1;
        }

        assert!(
            slots[0] == 0 && slots[REGION_COUNT] as usize == ENTRY_COUNT,
            "regions must cover every directory slot"
        );
        Self { slots, addrs }
    }

    /// The directory slots belonging to `region`. May be empty.
    pub const fn slots(&self, region: Region) -> Range<u16> {
        self.slots[region.index()]..self.slots[region.index() + 1]
    }

    /// How many directory slots `region` owns.
    pub const fn capacity(&self, region: Region) -> usize {
        (self.slots[region.index() + 1] - self.slots[region.index()]) as usize
    }

    /// The virtual addresses `region` was derived from, as `start..end`.
    pub const fn span(&self, region: Region) -> Range<u64> {
        self.addrs[region.index()]..self.addrs[region.index() + 1]
    }

    /// Returns the region that owns directory slot `index`.
    ///
    /// # Panics
    /// If no region owns the slot. [`RegionMap::new`] makes that impossible.
    pub fn classify(&self, index: PageTableIndex) -> Region {
        let slot = index.value();
        Region::ALL
            .into_iter()
            .find(|region| self.slots(*region).contains(&slot))
            .unwrap_or_else(|| panic!("directory slot {slot} is outside every region"))
    }

    /// Returns true if `index` is below the kernel, where page tables are listed page by page.
    pub const fn is_user(&self, index: PageTableIndex) -> bool {
        index.value() < self.slots[Region::User.index() + 1]
    }
}

impl Default for RegionMap {
    fn default() -> Self {
        Self::XV6
    }
}
