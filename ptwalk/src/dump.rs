use core::str::FromStr;

use log::debug;

use crate::{
    AddressSpace, DumpError, FreeSummary, ScanSummary, TranslationTrace,
    paging::{PhysMapper, VirtAddr},
};

/// What a dump should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DumpMode {
    /// Translate one address. `-p`, selector 1.
    Pointer,
    /// Scan the whole directory. `-t`, selector 2.
    Tables,
    /// Report unused slots. `-f`, selector 3.
    Free,
}

impl DumpMode {
    /// The command line flag for this mode.
    pub const fn flag(self) -> &'static str {
        match self {
            DumpMode::Pointer => "-p",
            DumpMode::Tables => "-t",
            DumpMode::Free => "-f",
        }
    }

    /// The numeric selector for this mode.
    pub const fn selector(self) -> i32 {
        match self {
            DumpMode::Pointer => 1,
            DumpMode::Tables => 2,
            DumpMode::Free => 3,
        }
    }
}

impl TryFrom<i32> for DumpMode {
    type Error = DumpError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DumpMode::Pointer),
            2 => Ok(DumpMode::Tables),
            3 => Ok(DumpMode::Free),
            other => Err(DumpError::UnknownMode(other)),
        }
    }
}

impl FromStr for DumpMode {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-p" => Ok(DumpMode::Pointer),
            "-t" => Ok(DumpMode::Tables),
            "-f" => Ok(DumpMode::Free),
            _ => Err(DumpError::InvalidModeFlag),
        }
    }
}

/// The result of [`AddressSpace::dump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpReport {
    /// See [`AddressSpace::walk`].
    Pointer(TranslationTrace),
    /// See [`AddressSpace::scan`].
    Tables(ScanSummary),
    /// See [`AddressSpace::free_summary`].
    Free(FreeSummary),
}

impl<M: PhysMapper> AddressSpace<'_, M> {
    /// Runs the dump selected by `mode`. `addr` is only used by [`DumpMode::Pointer`].
    pub fn dump(&self, mode: DumpMode, addr: VirtAddr) -> Result<DumpReport, DumpError> {
        debug!("dump {:?} of {:#x}", mode, self.root_addr());
        Ok(match mode {
            DumpMode::Pointer => DumpReport::Pointer(self.walk(addr)?),
            DumpMode::Tables => DumpReport::Tables(self.scan()?),
            DumpMode::Free => DumpReport::Free(self.free_summary()?),
        })
    }
}
