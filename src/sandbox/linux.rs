//! Landlock plus seccomp backend.

use std::fs;

use tracing::debug;

use super::landlock::apply_path_rules;
use super::seccomp::apply_syscall_filter;
use super::{ensure_unsealed, seal, PathGrant, Promises, Restrictor, TEMP_DIR};
use crate::error::{Result, SqliteUnsafeError};

/// Number of threads in this process, from `/proc/self/task`.
fn thread_count() -> Option<usize> {
    fs::read_dir("/proc/self/task").ok().map(|tasks| tasks.count())
}

/// Landlock only binds the calling thread, so every other thread would stay
/// unrestricted.
fn ensure_single_threaded(context: &str) -> Result<()> {
    match thread_count() {
        Some(1) => Ok(()),
        Some(n) => Err(SqliteUnsafeError::restriction_msg(
            context,
            format!("process has {n} threads, expected 1"),
        )),
        None => {
            debug!("/proc/self/task unavailable; thread count not checked");
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct LinuxRestrictor {
    _private: (),
}

impl LinuxRestrictor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Restrictor for LinuxRestrictor {
    fn name(&self) -> &'static str {
        "landlock+seccomp"
    }

    fn restrict_paths(&mut self, grants: &[PathGrant]) -> Result<()> {
        ensure_unsealed("landlock")?;
        ensure_single_threaded("landlock")?;

        // SQLite probes /var/tmp before /tmp; stat(2) is not covered by
        // Landlock, so it would pick a directory it cannot write to.
        if grants.iter().any(|grant| grant.path.as_os_str() == TEMP_DIR) {
            std::env::set_var("SQLITE_TMPDIR", TEMP_DIR);
            debug!(dir = TEMP_DIR, "SQLite temp directory pinned");
        }

        apply_path_rules(grants)
    }

    fn restrict_syscalls(&mut self, promises: &Promises) -> Result<()> {
        ensure_unsealed("seccomp")?;
        apply_syscall_filter(promises)?;
        seal("seccomp")
    }
}
