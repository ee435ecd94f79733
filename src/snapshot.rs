//! Loading page tables from JSON snapshot files.
//!
//! ```json
//! {
//!   "root": "0x1000",
//!   "layout": { "kernel_base": "0x80000000", "extmem": "0x100000",
//!               "phystop": "0xE000000", "devspace": "0xFE000000" },
//!   "tables": [ { "base": "0x1000", "entries": { "0": "0x2007" } } ],
//!   "bytes":  [ { "addr": "0x3000", "data": [104, 105] } ]
//! }
//! ```
//!
//! Numbers can be JSON numbers or strings in the address syntax of [`parse_number`].
use std::{fs, path::Path};

use jzon::JsonValue;
use lazy_static::lazy_static;
use log::{debug, info};
use ptwalk::{
    MemoryLayout,
    arch::ADDRESS_BITS,
    paging::{PageTable, PageTableEntry, PageTableIndex, PhysAddr},
};
use regex::Regex;

use crate::{
    CliError,
    memory::{SimulatedMemory, Snapshot},
};

// Hex needs the prefix. Underscores are allowed between digits, like in Rust literals.
const NUMBER_REGEX_RAW: &str = r"^(?:0[xX](?P<hex>[0-9a-fA-F][0-9a-fA-F_]*)|(?P<dec>[0-9][0-9_]*))$";

lazy_static! {
    static ref NUMBER_REGEX: Regex = Regex::new(NUMBER_REGEX_RAW).unwrap();
}

/// Parses a 32-bit number written as hex (`0x` prefix) or decimal. Underscores are ignored.
pub fn parse_number(text: &str) -> Option<u32> {
    let captures = NUMBER_REGEX.captures(text.trim())?;
    let (digits, radix) = match (captures.name("hex"), captures.name("dec")) {
        (Some(hex), _) => (hex.as_str(), 16),
        (None, Some(dec)) => (dec.as_str(), 10),
        (None, None) => return None,
    };
    let digits = digits.replace('_', "");
    u32::from_str_radix(&digits, radix).ok()
}

fn number(value: &JsonValue, what: &str) -> Result<u32, CliError> {
    let parsed = match value {
        JsonValue::Null => return Err(CliError::Snapshot(format!("missing {what}"))),
        _ if value.is_string() => value.as_str().and_then(parse_number),
        _ => value.as_u32(),
    };
    parsed.ok_or_else(|| CliError::Snapshot(format!("{what} is not a 32-bit number: {value}")))
}

fn page_address(value: &JsonValue, what: &str) -> Result<PhysAddr, CliError> {
    let addr = PhysAddr::new(number(value, what)?);
    if !addr.is_page_aligned() {
        return Err(CliError::Snapshot(format!("{what} {addr:#x} is not page aligned")));
    }
    Ok(addr)
}

fn layout(value: &JsonValue) -> Result<MemoryLayout, CliError> {
    if value.is_null() {
        return Ok(MemoryLayout::XV6);
    }
    let layout = MemoryLayout {
        kernel_base: number(&value["kernel_base"], "layout.kernel_base")?,
        extmem: number(&value["extmem"], "layout.extmem")?,
        phystop: number(&value["phystop"], "layout.phystop")?,
        devspace: number(&value["devspace"], "layout.devspace")?,
    };

    // The region map panics on these, so catch them while they're still a user error.
    let bounds = layout.boundaries();
    if bounds.iter().any(|addr| *addr > 1 << ADDRESS_BITS) {
        return Err(CliError::Snapshot(format!("layout runs past the address space: {layout:?}")));
    }
    if bounds.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(CliError::Snapshot(format!("layout regions are out of order: {layout:?}")));
    }
    Ok(layout)
}

fn table(value: &JsonValue) -> Result<(PhysAddr, PageTable), CliError> {
    let base = page_address(&value["base"], "table base")?;
    let entries = &value["entries"];
    if !entries.is_object() {
        return Err(CliError::Snapshot(format!("table {base:#x} has no entries object")));
    }

    let mut table = PageTable::new();
    for (key, raw) in entries.entries() {
        let index = key
            .parse::<u16>()
            .ok()
            .and_then(PageTableIndex::try_new)
            .ok_or_else(|| CliError::Snapshot(format!("table {base:#x}: bad slot {key:?}")))?;
        table[index] = PageTableEntry::from_raw(number(raw, "entry")?);
    }
    Ok((base, table))
}

fn bytes(value: &JsonValue, memory: &mut SimulatedMemory) -> Result<(), CliError> {
    let addr = PhysAddr::new(number(&value["addr"], "bytes address")?);
    let data = value["data"]
        .members()
        .map(|byte| {
            byte.as_u8()
                .ok_or_else(|| CliError::Snapshot(format!("bytes at {addr:#x}: {byte} is not a byte")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    memory.write_bytes(addr, &data);
    Ok(())
}

/// Builds a snapshot out of the JSON in `text`.
pub fn parse(text: &str) -> Result<Snapshot, CliError> {
    let json = jzon::parse(text)?;
    if !json.is_object() {
        return Err(CliError::Snapshot("top level must be an object".to_string()));
    }

    let root = page_address(&json["root"], "root")?;
    let layout = layout(&json["layout"])?;
    let mut memory = SimulatedMemory::new();

    for value in json["tables"].members() {
        let (base, table) = table(value)?;
        if memory.has_table(base) {
            return Err(CliError::Snapshot(format!("table {base:#x} is listed twice")));
        }
        memory.insert_table(base, table);
    }
    for value in json["bytes"].members() {
        bytes(value, &mut memory)?;
    }

    debug!(
        "Parsed snapshot: root {:#x}, {} tables, {} data frames",
        root,
        memory.table_count(),
        memory.frame_count()
    );
    Ok(Snapshot {
        memory,
        root,
        layout,
    })
}

/// Reads and parses the snapshot file at `path`.
pub fn load(path: &Path) -> Result<Snapshot, CliError> {
    info!("Loading snapshot from {}", path.display());
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}
