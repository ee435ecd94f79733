//! Text output for the three dump modes.

use std::fmt::{self, Write};

use ptwalk::{
    AddressSpace, DumpMode, FreeSummary, Region, RegionMap, ScanEvent, ScanSummary,
    TranslationTrace, WalkStep,
    arch::PageTableFlags,
    paging::{PhysMapper, VirtAddr},
};

use crate::CliError;

fn flag_line(out: &mut impl Write, name: &str, flags: PageTableFlags) -> fmt::Result {
    write!(out, "  {name} flags: ")?;
    for label in flags.labels() {
        write!(out, "{label}, ")?;
    }
    if flags.has_must_be_zero() {
        write!(out, "bits must be zero, ")?;
    }
    writeln!(out)
}

fn step(out: &mut impl Write, long: &str, name: &str, step: &WalkStep) -> fmt::Result {
    writeln!(out, "{:<22}{:#x}", format!("{long}:"), step.entry)?;
    writeln!(out, "{:<22}{:#x}", format!("{name} flags:"), step.entry.flag_bits())?;
    flag_line(out, name, step.flags())
}

/// Writes the lookup of one address, directory entry first. `value` is the byte found at the
/// physical location, if it could be read.
pub fn render_trace(
    out: &mut impl Write,
    trace: &TranslationTrace,
    value: Option<u8>,
) -> fmt::Result {
    let parts = trace.parts();
    writeln!(out, "-- tracing lookup of pointer --")?;
    writeln!(out, "virtual address:      {:#x}\n..", trace.addr())?;
    writeln!(out, "page directory index: {:#x}", parts.directory.value())?;
    writeln!(out, "page table index:     {:#x}", parts.table.value())?;
    writeln!(out, "offset in page:       {:#x}\n..", parts.offset.value())?;

    step(out, "page directory entry", "pde", trace.directory())?;
    let Some(table) = trace.table() else {
        return writeln!(out, "page directory entry not present, address is unmapped");
    };
    writeln!(out, "page table address:   {:#x}\n..", table.table)?;

    step(out, "page table entry", "pte", table)?;
    let Some(physical) = trace.physical() else {
        return writeln!(out, "page table entry not present, address is unmapped");
    };
    writeln!(out, "page address:         {:#x}\n..", table.entry.addr())?;
    writeln!(out, "physical location:    {:#x}", physical)?;
    match value {
        Some(value) => writeln!(out, "value at location:    {value:#x}"),
        None => writeln!(out, "value at location:    (not readable)"),
    }
}

fn region_line(out: &mut impl Write, map: &RegionMap, region: Region) -> fmt::Result {
    let span = map.span(region);
    let end = span.end.min(u64::from(u32::MAX));
    let (from, to) = region.bounds_label();
    write!(out, "{:#010x} ({from}) - {end:#010x} ({to}), ", span.start)
}

/// Writes every present entry found by a scan, followed by the per-region summary.
pub fn render_tables(
    out: &mut impl Write,
    events: &[ScanEvent],
    summary: &ScanSummary,
) -> fmt::Result {
    writeln!(out, "PDE's for virtual addresses below KERNBASE -")?;
    let map = summary.region_map();
    let mut in_table = None;

    for event in events {
        match event {
            ScanEvent::Directory { index, entry, .. } => {
                if let Some(count) = in_table.take() {
                    writeln!(out, "  - {count} pages present in that PT")?;
                }
                if !map.is_user(*index) {
                    continue;
                }
                writeln!(
                    out,
                    " PDE: row {:#x} (so virtual address {:#010x}), pde {:#x}, page table at {:#x}",
                    index.value(),
                    event.addr(),
                    entry,
                    entry.addr()
                )?;
                in_table = Some(0usize);
            }
            ScanEvent::Page { index, entry, .. } => {
                writeln!(
                    out,
                    "  PTE: row {:#x} (so virtual address {:#010x}), pte {:#x}, physical page at {:#x}",
                    index.value(),
                    event.addr(),
                    entry,
                    entry.addr()
                )?;
                if let Some(count) = in_table.as_mut() {
                    *count += 1;
                }
            }
        }
    }
    if let Some(count) = in_table {
        writeln!(out, "  - {count} pages present in that PT")?;
    }

    writeln!(out, "\nVirtual memory summary ...")?;
    writeln!(
        out,
        "{} page tables present, {} pages total.",
        summary.directories(),
        summary.pages()
    )?;
    for (region, present, capacity) in summary.iter() {
        region_line(out, map, region)?;
        writeln!(out, "#pdes = {present} (out of {capacity} total possible)")?;
    }
    Ok(())
}

/// Writes the unused directory slots of every region.
pub fn render_free(out: &mut impl Write, free: &FreeSummary) -> fmt::Result {
    writeln!(out, "Free virtual memory summary ...")?;
    writeln!(
        out,
        "{} page directory slots free, {} page table slots free under user page tables.",
        free.directories(),
        free.pages()
    )?;
    let map = free.region_map();
    for region in Region::ALL {
        region_line(out, map, region)?;
        writeln!(
            out,
            "#free pdes = {} (out of {} total possible)",
            free.region(region),
            map.capacity(region)
        )?;
    }
    Ok(())
}

/// Runs the dump selected by `mode` against `space` and renders it.
pub fn write_dump<M: PhysMapper>(
    out: &mut impl Write,
    space: &AddressSpace<'_, M>,
    mode: DumpMode,
    addr: VirtAddr,
) -> Result<(), CliError> {
    match mode {
        DumpMode::Pointer => {
            let trace = space.walk(addr)?;
            render_trace(out, &trace, space.read_byte(&trace))?;
        }
        DumpMode::Tables => {
            let mut events = Vec::new();
            let summary = space.scan_with(|event| events.push(event))?;
            render_tables(out, &events, &summary)?;
        }
        DumpMode::Free => render_free(out, &space.free_summary()?)?,
    }
    Ok(())
}

/// Runs the dump and returns it as a string.
pub fn render_dump<M: PhysMapper>(
    space: &AddressSpace<'_, M>,
    mode: DumpMode,
    addr: VirtAddr,
) -> Result<String, CliError> {
    let mut out = String::new();
    write_dump(&mut out, space, mode, addr)?;
    Ok(out)
}
