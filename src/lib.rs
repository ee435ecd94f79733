//! ptdump - the host side of `ptwalk`: simulated physical memory, snapshot files, a built-in xv6
//! process and the text output of the page table dumps.
use std::{env, path::PathBuf};

use log::debug;
use ptwalk::{DumpMode, paging::VirtAddr};

pub mod demo;
pub mod memory;
pub mod render;
pub mod snapshot;

mod error;

pub use error::CliError;

const USAGE: &str = "ptdump -p <ADDR> | -t | -f [--snapshot FILE]";

/// What to dump, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Which dump to run.
    pub mode: DumpMode,
    /// Only used by [`DumpMode::Pointer`].
    pub addr: VirtAddr,
    /// Snapshot file to load. The built-in xv6 process is used if this is `None`.
    pub snapshot: Option<PathBuf>,
}

impl Config {
    /// Parses the command line, without the program name.
    ///
    /// `PTDUMP_SNAPSHOT` is used when no `--snapshot` is given.
    pub fn from_args<I>(args: I) -> Result<Config, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let mut mode = None;
        let mut addr = None;
        let mut snapshot = env::var_os("PTDUMP_SNAPSHOT").map(PathBuf::from);

        while let Some(arg) = args.next() {
            if arg == "--snapshot" {
                let path = args
                    .next()
                    .ok_or_else(|| CliError::Usage(format!("--snapshot needs a file\n{USAGE}")))?;
                snapshot = Some(PathBuf::from(path));
                continue;
            }
            if mode.is_some() {
                return Err(CliError::Usage(format!("unexpected argument {arg:?}\n{USAGE}")));
            }
            let parsed = arg.parse::<DumpMode>()?;
            if parsed == DumpMode::Pointer {
                let text = args
                    .next()
                    .ok_or_else(|| CliError::Usage(format!("-p needs an address\n{USAGE}")))?;
                let value = snapshot::parse_number(&text).ok_or(CliError::InvalidAddress(text))?;
                addr = Some(VirtAddr::new(value));
            }
            mode = Some(parsed);
        }

        let mode = mode.ok_or_else(|| CliError::Usage(USAGE.to_string()))?;
        Ok(Config {
            mode,
            addr: addr.unwrap_or(VirtAddr::new(0)),
            snapshot,
        })
    }

    /// Loads the address space and renders the dump.
    pub fn run(&self) -> Result<String, CliError> {
        let snapshot = match &self.snapshot {
            Some(path) => snapshot::load(path)?,
            None => demo::xv6_process(),
        };
        debug!("Running {:?}", self);
        let space = snapshot.space()?;
        render::render_dump(&space, self.mode, self.addr)
    }
}

#[cfg(test)]
mod tests {
    use ptwalk::DumpError;

    use super::*;

    fn config(args: &[&str]) -> Result<Config, CliError> {
        Config::from_args(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let cfg = config(&["-p", "0x8010_0000"]).unwrap();
        assert_eq!(cfg.mode, DumpMode::Pointer);
        assert_eq!(cfg.addr, VirtAddr::new(0x8010_0000));

        let cfg = config(&["--snapshot", "a.json", "-t"]).unwrap();
        assert_eq!(cfg.mode, DumpMode::Tables);
        assert_eq!(cfg.snapshot, Some(PathBuf::from("a.json")));

        assert_eq!(config(&["-f"]).unwrap().mode, DumpMode::Free);
    }

    #[test]
    fn test_bad_args() {
        assert!(matches!(config(&[]), Err(CliError::Usage(_))));
        assert!(matches!(config(&["-p"]), Err(CliError::Usage(_))));
        assert!(matches!(config(&["-t", "-f"]), Err(CliError::Usage(_))));
        assert!(matches!(config(&["-t", "--snapshot"]), Err(CliError::Usage(_))));
        assert!(matches!(
            config(&["-x"]),
            Err(CliError::Dump(DumpError::InvalidModeFlag))
        ));
        assert!(matches!(
            config(&["-p", "nope"]),
            Err(CliError::InvalidAddress(text)) if text == "nope"
        ));
    }

    #[test]
    fn test_run_demo() {
        let cfg = Config {
            mode: DumpMode::Pointer,
            addr: VirtAddr::new(0x8000_0000),
            snapshot: None,
        };
        let out = cfg.run().unwrap();
        assert!(out.contains("physical location:    0x0\n"));
    }
}
