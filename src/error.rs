use std::{fmt, io, path::PathBuf};

use ptwalk::DumpError;

/// Everything that can go wrong between the command line and the output.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Dump(#[from] DumpError),
    #[error("Usage: {0}")]
    Usage(String),
    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] jzon::Error),
    #[error("Bad snapshot: {0}")]
    Snapshot(String),
    #[error("Failed to write the dump")]
    Format(#[from] fmt::Error),
}
