//! Splitting virtual addresses into their paging fields and putting them back together.

use crate::{
    arch::PAGING_LEVELS,
    paging::{PageOffset, PageTableIndex, VirtAddr},
};

/// A virtual address split into the fields the MMU uses to translate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecomposedAddr {
    /// Slot in the page directory.
    pub directory: PageTableIndex,
    /// Slot in the page table selected by `directory`.
    pub table: PageTableIndex,
    /// Byte within the page.
    pub offset: PageOffset,
}

impl DecomposedAddr {
    /// Reassembles the virtual address. Same as [`compose`].
    pub const fn compose(self) -> VirtAddr {
        compose(self.directory, self.table, self.offset)
    }
}

impl From<VirtAddr> for DecomposedAddr {
    fn from(addr: VirtAddr) -> Self {
        decompose(addr)
    }
}

impl From<DecomposedAddr> for VirtAddr {
    fn from(parts: DecomposedAddr) -> Self {
        parts.compose()
    }
}

/// Splits `addr` into directory index, table index and page offset.
pub const fn decompose(addr: VirtAddr) -> DecomposedAddr {
    DecomposedAddr {
        directory: addr.directory_index(),
        table: addr.page_table_index(),
        offset: addr.page_offset(),
    }
}

/// Builds the virtual address selected by the given directory index, table index and offset.
/// This is xv6's `PGADDR`.
pub const fn compose(
    directory: PageTableIndex,
    table: PageTableIndex,
    offset: PageOffset,
) -> VirtAddr {
    let directory = (directory.value() as u32) << VirtAddr::level_shift(PAGING_LEVELS - 1);
    let table = (table.value() as u32) << VirtAddr::level_shift(0);
    VirtAddr::new(directory | table | offset.value() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_known_address() {
        let parts = decompose(VirtAddr::new(0x8010_2abc));
        assert_eq!(parts.directory, PageTableIndex::new(0x200));
        assert_eq!(parts.table, PageTableIndex::new(0x102));
        assert_eq!(parts.offset, PageOffset::new(0xabc));
    }

    #[test]
    fn test_compose_matches_arithmetic() {
        let addr = compose(
            PageTableIndex::new(3),
            PageTableIndex::new(7),
            PageOffset::new(42),
        );
        assert_eq!(addr.as_u32(), 3 * 1024 * 4096 + 7 * 4096 + 42);
    }

    #[test]
    fn test_compose_inverts_decompose() {
        // Every directory/table boundary, plus a spread of odd values in between.
        let mut values = vec![0, 1, 0xfff, 0x1000, 0x3f_ffff, 0x40_0000, u32::MAX];
        values.extend((0..u32::MAX).step_by(0x0001_0f3b).take(70_000));
        for value in values {
            let addr = VirtAddr::new(value);
            assert_eq!(decompose(addr).compose(), addr, "{addr:?}");
        }
    }

    #[test]
    fn test_decompose_inverts_compose() {
        let offsets = [0u16, 1, 0x7ff, 0xfff];
        for directory in PageTableIndex::all().step_by(7) {
            for table in PageTableIndex::all().step_by(13) {
                for offset in offsets.map(PageOffset::new) {
                    let parts = DecomposedAddr {
                        directory,
                        table,
                        offset,
                    };
                    assert_eq!(decompose(compose(directory, table, offset)), parts);
                }
            }
        }
    }
}
