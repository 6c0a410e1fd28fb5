//! Error types for sqlite-unsafe.
//!
//! Every variant is fatal to the run: it is reported once on stderr and the
//! process exits with status 1.

use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sqlite-unsafe operations.
#[derive(Error, Debug)]
pub enum SqliteUnsafeError {
    /// Wrong number of positional arguments.
    #[error("usage: {program} file sql")]
    Usage { program: String },

    /// No restriction path could be derived from the target path.
    #[error("{}: {reason}", path.display())]
    Path { path: PathBuf, reason: String },

    /// Copying the target path for restriction failed.
    #[error("{0}")]
    Allocation(#[from] TryReserveError),

    /// The operating system refused a path or syscall restriction.
    #[error("{context}: {source}")]
    Restriction {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The engine could not open the target file.
    #[error("{}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    /// A hardening toggle on the open handle failed.
    #[error("{0}")]
    Config(String),

    /// The query failed inside the engine.
    #[error("{0}")]
    Exec(String),

    /// The handle could not be closed after a successful run.
    #[error("{0}")]
    Close(String),

    /// Writing result rows to stdout failed.
    #[error("stdout: {0}")]
    Output(#[source] io::Error),

    /// Internal application errors (runtime setup, unexpected states).
    #[error("{0}")]
    Internal(String),
}

impl SqliteUnsafeError {
    /// Creates a usage error for the given program name.
    pub fn usage(program: impl Into<String>) -> Self {
        Self::Usage {
            program: program.into(),
        }
    }

    /// Creates a path error for the given path.
    pub fn path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a restriction error from an OS error.
    pub fn restriction(context: impl Into<String>, source: io::Error) -> Self {
        Self::Restriction {
            context: context.into(),
            source,
        }
    }

    /// Creates a restriction error that has no underlying OS error.
    pub fn restriction_msg(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::restriction(context, io::Error::other(msg.into()))
    }

    /// Creates an open error for the given path.
    pub fn open(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn exec(msg: impl Into<String>) -> Self {
        Self::Exec(msg.into())
    }

    /// Creates a close error with the given message.
    pub fn close(msg: impl Into<String>) -> Self {
        Self::Close(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Usage { .. } => "Usage Error",
            Self::Path { .. } => "Path Error",
            Self::Allocation(_) => "Allocation Error",
            Self::Restriction { .. } => "Restriction Error",
            Self::Open { .. } => "Open Error",
            Self::Config(_) => "Config Error",
            Self::Exec(_) => "Exec Error",
            Self::Close(_) => "Close Error",
            Self::Output(_) => "Output Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Result type alias using SqliteUnsafeError.
pub type Result<T> = std::result::Result<T, SqliteUnsafeError>;
