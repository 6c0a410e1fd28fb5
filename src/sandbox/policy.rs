//! The restriction set: which paths and syscall categories survive lockdown.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, SqliteUnsafeError};

/// Random source SQLite reads when seeding its PRNG.
pub const RANDOM_SOURCE: &str = "/dev/urandom";

/// Directory SQLite may use for temporary files.
pub const TEMP_DIR: &str = "/tmp";

/// Syscall categories the query needs, in the order they are declared.
pub const QUERY_PROMISES: [Promise; 5] = [
    Promise::Stdio,
    Promise::Rpath,
    Promise::Wpath,
    Promise::Cpath,
    Promise::Flock,
];

/// Access granted beneath a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub create: bool,
}

impl Permissions {
    pub const READ: Self = Self {
        read: true,
        write: false,
        create: false,
    };

    pub const READ_WRITE_CREATE: Self = Self {
        read: true,
        write: true,
        create: true,
    };
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.read {
            f.write_str("r")?;
        }
        if self.write {
            f.write_str("w")?;
        }
        if self.create {
            f.write_str("c")?;
        }
        Ok(())
    }
}

/// A single filesystem path the process keeps access to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGrant {
    pub path: PathBuf,
    pub permissions: Permissions,
}

impl PathGrant {
    pub fn new(path: impl Into<PathBuf>, permissions: Permissions) -> Self {
        Self {
            path: path.into(),
            permissions,
        }
    }
}

/// A syscall category, named after its pledge(2) promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Promise {
    /// Basic I/O on already open descriptors, memory, time, threads.
    Stdio,
    /// Read-only path operations.
    Rpath,
    /// Write path operations.
    Wpath,
    /// Creating and removing files and directories.
    Cpath,
    /// Advisory file locking.
    Flock,
}

impl Promise {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Rpath => "rpath",
            Self::Wpath => "wpath",
            Self::Cpath => "cpath",
            Self::Flock => "flock",
        }
    }
}

/// The syscall categories that stay available after lockdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promises(Vec<Promise>);

impl Promises {
    pub fn new(promises: impl IntoIterator<Item = Promise>) -> Self {
        let mut list = Vec::new();
        for promise in promises {
            if !list.contains(&promise) {
                list.push(promise);
            }
        }
        Self(list)
    }

    pub fn contains(&self, promise: Promise) -> bool {
        self.0.contains(&promise)
    }

    pub fn iter(&self) -> impl Iterator<Item = Promise> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for Promises {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, promise) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(promise.as_str())?;
        }
        Ok(())
    }
}

/// Everything the process may still touch once locked down.
///
/// Built once from the target path, committed once through
/// [`RestrictionSet::commit`](super::RestrictionSet::commit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionSet {
    pub(super) grants: Vec<PathGrant>,
    pub(super) promises: Promises,
}

impl RestrictionSet {
    /// Builds the restriction set for running one query against `target`.
    pub fn for_database(target: &Path) -> Result<Self> {
        let dir = containing_dir(target)?;
        Ok(Self {
            grants: vec![
                PathGrant::new(dir, Permissions::READ_WRITE_CREATE),
                PathGrant::new(RANDOM_SOURCE, Permissions::READ),
                PathGrant::new(TEMP_DIR, Permissions::READ_WRITE_CREATE),
            ],
            promises: Promises::new(QUERY_PROMISES),
        })
    }

    pub fn grants(&self) -> &[PathGrant] {
        &self.grants
    }

    pub fn promises(&self) -> &Promises {
        &self.promises
    }
}

/// Returns the directory containing `path`, with dirname(3) semantics.
///
/// A bare file name yields `.`, and the root is its own parent.
pub fn containing_dir(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(SqliteUnsafeError::path(path, "empty path"));
    }

    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => match path.components().next() {
            Some(Component::RootDir) | Some(Component::Prefix(_)) => path,
            _ => return Err(SqliteUnsafeError::path(path, "no containing directory")),
        },
    };

    let mut dir = PathBuf::new();
    dir.try_reserve_exact(parent.as_os_str().len())?;
    dir.push(parent);
    Ok(dir)
}
