//! Scanning a whole page directory.

use log::{debug, warn};

use crate::{
    AddressSpace, DumpError,
    arch::ENTRY_COUNT,
    layout::{REGION_COUNT, Region, RegionMap},
    paging::{PageOffset, PageTableEntry, PageTableIndex, PhysMapper, VirtAddr, compose},
};

/// Something the scanner found, in the order it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    /// A present directory entry. Sent before any of the pages under it.
    Directory {
        /// Slot in the page directory.
        index: PageTableIndex,
        /// The entry.
        entry: PageTableEntry,
        /// Region the slot belongs to.
        region: Region,
    },
    /// A present table entry under a user directory entry.
    Page {
        /// Slot in the page directory.
        directory: PageTableIndex,
        /// Slot in the page table.
        index: PageTableIndex,
        /// The entry.
        entry: PageTableEntry,
    },
}

impl ScanEvent {
    /// The first virtual address covered by the entry.
    pub const fn addr(&self) -> VirtAddr {
        match *self {
            ScanEvent::Directory { index, .. } => VirtAddr::from_directory_index(index),
            ScanEvent::Page {
                directory, index, ..
            } => compose(directory, index, PageOffset::new(0)),
        }
    }

    /// The entry found.
    pub const fn entry(&self) -> PageTableEntry {
        match *self {
            ScanEvent::Directory { entry, .. } | ScanEvent::Page { entry, .. } => entry,
        }
    }
}

/// Totals from a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    directories: usize,
    user_directories: usize,
    pages: usize,
    regions: [usize; REGION_COUNT],
    map: RegionMap,
}

impl ScanSummary {
    fn new(map: RegionMap) -> Self {
        Self {
            directories: 0,
            user_directories: 0,
            pages: 0,
            regions: [0; REGION_COUNT],
            map,
        }
    }

    /// Present directory entries (i.e. page tables), in every region.
    pub const fn directories(&self) -> usize {
        self.directories
    }

    /// Present table entries under user directory entries.
    pub const fn pages(&self) -> usize {
        self.pages
    }

    /// Present directory entries in `region`.
    pub const fn region(&self, region: Region) -> usize {
        self.regions[region.index()]
    }

    /// The region map the scan classified with.
    pub const fn region_map(&self) -> &RegionMap {
        &self.map
    }

    /// Every region with its present count and capacity, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = (Region, usize, usize)> + '_ {
        Region::ALL
            .into_iter()
            .map(|region| (region, self.region(region), self.map.capacity(region)))
    }
}

/// What's left unused, for the free summary dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeSummary {
    directories: [usize; REGION_COUNT],
    pages: usize,
    map: RegionMap,
}

impl FreeSummary {
    /// Non-present directory slots in `region`.
    pub const fn region(&self, region: Region) -> usize {
        self.directories[region.index()]
    }

    /// Non-present table slots under present user directory entries.
    pub const fn pages(&self) -> usize {
        self.pages
    }

    /// Non-present directory slots over every region.
    pub fn directories(&self) -> usize {
        self.directories.iter().sum()
    }

    /// The region map the scan classified with.
    pub const fn region_map(&self) -> &RegionMap {
        &self.map
    }
}

impl From<&ScanSummary> for FreeSummary {
    fn from(summary: &ScanSummary) -> Self {
        let map = *summary.region_map();
        Self {
            directories: Region::ALL.map(|region| map.capacity(region) - summary.region(region)),
            pages: summary.user_directories * ENTRY_COUNT - summary.pages,
            map,
        }
    }
}

impl<M: PhysMapper> AddressSpace<'_, M> {
    /// Counts every present entry. See [`AddressSpace::scan_with`].
    pub fn scan(&self) -> Result<ScanSummary, DumpError> {
        self.scan_with(|_| {})
    }

    /// Scans the whole directory, calling `visit` for every present entry found.
    ///
    /// Every present directory entry is counted against its region. Only user directory entries
    /// have their page tables read, everything from the kernel base up is counted at the
    /// directory level.
    pub fn scan_with<F>(&self, mut visit: F) -> Result<ScanSummary, DumpError>
    where
        F: FnMut(ScanEvent),
    {
        let regions = self.regions();
        let mut summary = ScanSummary::new(*regions);

        for (index, entry) in self.root().present() {
            let region = regions.classify(index);
            summary.directories += 1;
            summary.regions[region.index()] += 1;
            visit(ScanEvent::Directory {
                index,
                entry,
                region,
            });

            if !regions.is_user(index) {
                continue;
            }
            summary.user_directories += 1;

            let table = self.mapper().table(entry.addr()).ok_or_else(|| {
                warn!(
                    "scan: page table at {:#x} (slot {}) is not accessible",
                    entry.addr(),
                    index.value()
                );
                DumpError::InaccessibleTable {
                    table: entry.addr(),
                    slot: index.value(),
                }
            })?;

            for (slot, page) in table.present() {
                summary.pages += 1;
                visit(ScanEvent::Page {
                    directory: index,
                    index: slot,
                    entry: page,
                });
            }
        }

        debug!(
            "scan of {:#x}: {} page tables, {} pages, regions {:?}",
            self.root_addr(),
            summary.directories,
            summary.pages,
            summary.regions
        );
        Ok(summary)
    }

    /// Scans the directory and reports what is not in use.
    pub fn free_summary(&self) -> Result<FreeSummary, DumpError> {
        Ok(FreeSummary::from(&self.scan()?))
    }
}
