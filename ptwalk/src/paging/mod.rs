//! The in-memory paging structures and how to read them.

pub mod decompose;
pub mod entry;
pub mod index;
pub mod mapper;
pub mod table;

pub use decompose::{DecomposedAddr, compose, decompose};
pub use entry::PageTableEntry;
pub use index::{PageOffset, PageTableIndex};
pub use mapper::{DirectMapping, PhysMapper};
pub use table::{PageDirectory, PageTable};

/// The virtual address type used by the current architecture.
pub type VirtAddr = crate::arch::VirtAddr;
/// The physical address type used by the current architecture.
pub type PhysAddr = crate::arch::PhysAddr;
