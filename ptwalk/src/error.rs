use crate::paging::PhysAddr;

/// Everything that can stop a dump from producing a result.
///
/// An unmapped address is not an error: it is a [`TranslationTrace`](crate::TranslationTrace)
/// with the missing parts left empty.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DumpError {
    #[error("Unknown dump mode: {0}")]
    UnknownMode(i32),
    #[error("Invalid dump flag (expected -p, -t or -f)")]
    InvalidModeFlag,
    #[error("Page directory address is null")]
    NullRoot,
    #[error("Page directory address {0:#x} is not page aligned")]
    UnalignedRoot(PhysAddr),
    #[error("Page directory at {0:#x} is not accessible")]
    InaccessibleRoot(PhysAddr),
    #[error("Page table at {table:#x} (directory slot {slot}) is not accessible")]
    InaccessibleTable { table: PhysAddr, slot: u16 },
}
