//! Command-line argument parsing for sqlite-unsafe.
//!
//! Exactly two positionals: the database file and the SQL text. Anything else
//! is a usage error.

use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Run one SQL statement against a SQLite file inside a locked-down process.
#[derive(Parser, Debug)]
#[command(name = "sqlite-unsafe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Database file; its directory stays writable after lockdown
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// SQL text, run as-is
    #[arg(value_name = "SQL", allow_hyphen_values = true)]
    pub sql: String,
}

/// The validated request for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub file: PathBuf,
    pub sql: String,
}

impl From<Cli> for Invocation {
    fn from(cli: Cli) -> Self {
        Self {
            file: cli.file,
            sql: cli.sql,
        }
    }
}

impl Cli {
    /// Parses `args` (including the program name) into an [`Invocation`].
    ///
    /// Help and version requests come back as errors whose
    /// [`use_stderr`](clap::Error::use_stderr) is false.
    pub fn try_parse_invocation<I, T>(args: I) -> std::result::Result<Invocation, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map(Invocation::from)
    }
}

/// Base name of `argv[0]`, like getprogname(3).
pub fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
