use core::fmt;

use log::debug;

use crate::{
    DumpError,
    layout::RegionMap,
    paging::{PageDirectory, PhysAddr, PhysMapper},
};

/// A borrowed, read-only view of one process' paging structures.
///
/// The caller has to make sure nothing remaps or tears down the address space while this exists.
pub struct AddressSpace<'a, M: PhysMapper> {
    root: &'a PageDirectory,
    root_addr: PhysAddr,
    mapper: &'a M,
    regions: RegionMap,
}

impl<'a, M: PhysMapper> AddressSpace<'a, M> {
    /// Opens the page directory at `root` (what would be in CR3) using the xv6 region layout.
    pub fn new(root: PhysAddr, mapper: &'a M) -> Result<Self, DumpError> {
        Self::with_regions(root, mapper, RegionMap::XV6)
    }

    /// Opens the page directory at `root`, classifying directory slots with `regions`.
    pub fn with_regions(
        root: PhysAddr,
        mapper: &'a M,
        regions: RegionMap,
    ) -> Result<Self, DumpError> {
        if root.is_null() {
            return Err(DumpError::NullRoot);
        }
        if !root.is_page_aligned() {
            return Err(DumpError::UnalignedRoot(root));
        }
        let directory = mapper.table(root).ok_or(DumpError::InaccessibleRoot(root))?;
        debug!("Opened page directory at {:#x} with {:?}", root, regions);

        Ok(Self {
            root: directory,
            root_addr: root,
            mapper,
            regions,
        })
    }

    /// The page directory.
    pub fn root(&self) -> &'a PageDirectory {
        self.root
    }

    /// Physical address of the page directory.
    pub fn root_addr(&self) -> PhysAddr {
        self.root_addr
    }

    /// The mapper used to reach page tables.
    pub fn mapper(&self) -> &'a M {
        self.mapper
    }

    /// The region map used to classify directory slots.
    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }
}

impl<M: PhysMapper> fmt::Debug for AddressSpace<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("root_addr", &self.root_addr)
            .field("regions", &self.regions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestMemory;

    #[test]
    fn test_rejects_bad_roots() {
        let mem = TestMemory::new(2);
        assert_eq!(
            AddressSpace::new(PhysAddr::NULL, &mem).unwrap_err(),
            DumpError::NullRoot
        );
        assert_eq!(
            AddressSpace::new(PhysAddr::new(0x1004), &mem).unwrap_err(),
            DumpError::UnalignedRoot(PhysAddr::new(0x1004))
        );
        assert_eq!(
            AddressSpace::new(PhysAddr::new(0x9000), &mem).unwrap_err(),
            DumpError::InaccessibleRoot(PhysAddr::new(0x9000))
        );
    }

    #[test]
    fn test_opens_valid_root() {
        let mem = TestMemory::new(2);
        let space = AddressSpace::new(mem.root(), &mem).unwrap();
        assert_eq!(space.root_addr(), mem.root());
        assert_eq!(space.regions(), &RegionMap::XV6);
        assert_eq!(space.root().present().count(), 0);
    }
}
