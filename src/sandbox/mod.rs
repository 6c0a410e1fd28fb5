//! Process lockdown before the database is touched.
//!
//! A [`RestrictionSet`] names the paths and syscall categories a single query
//! run needs. Committing it through a [`Restrictor`] hands both lists to the
//! operating system, paths first, and returns a [`Lockdown`] token. Opening a
//! database requires that token, so the engine only ever runs restricted.
//!
//! Backends are chosen at build time:
//! - OpenBSD: `unveil(2)` and `pledge(2)`
//! - Linux: Landlock and a seccomp filter
//! - elsewhere: [`NoopRestrictor`], which warns and leaves the process as is

#[cfg(target_os = "linux")]
mod landlock;
#[cfg(target_os = "linux")]
mod linux;
mod noop;
#[cfg(target_os = "openbsd")]
mod openbsd;
mod policy;
#[cfg(target_os = "linux")]
mod seccomp;

#[cfg(target_os = "linux")]
pub use linux::LinuxRestrictor;
pub use noop::NoopRestrictor;
#[cfg(target_os = "openbsd")]
pub use openbsd::OpenBsdRestrictor;
pub use policy::{
    containing_dir, PathGrant, Permissions, Promise, Promises, RestrictionSet, QUERY_PROMISES,
    RANDOM_SOURCE, TEMP_DIR,
};

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::error::{Result, SqliteUnsafeError};

/// Backend that commits restrictions to the operating system.
///
/// Both operations are one-way. Once `restrict_syscalls` has succeeded the
/// backend must refuse any further commit.
///
/// Landlock and unveil bind the calling thread and its future children, so
/// commits must happen while the process has a single thread. The Linux
/// backend refuses to commit otherwise.
pub trait Restrictor {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Limits filesystem visibility to `grants`.
    fn restrict_paths(&mut self, grants: &[PathGrant]) -> Result<()>;

    /// Limits the syscall surface to `promises`. Always the last commit.
    fn restrict_syscalls(&mut self, promises: &Promises) -> Result<()>;
}

/// Proof that a [`RestrictionSet`] has been committed.
///
/// Only [`RestrictionSet::commit`] creates one.
#[derive(Debug)]
pub struct Lockdown {
    backend: &'static str,
}

impl Lockdown {
    /// Name of the backend that enforced the restrictions.
    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

impl RestrictionSet {
    /// Commits the path grants and then the syscall promises.
    ///
    /// If the path step fails the syscall step is not attempted and no
    /// [`Lockdown`] is returned.
    pub fn commit<R>(self, restrictor: &mut R) -> Result<Lockdown>
    where
        R: Restrictor + ?Sized,
    {
        debug!(backend = restrictor.name(), grants = ?self.grants, "Restricting paths");
        restrictor.restrict_paths(&self.grants)?;

        debug!(backend = restrictor.name(), promises = %self.promises, "Restricting syscalls");
        restrictor.restrict_syscalls(&self.promises)?;

        info!(backend = restrictor.name(), "Process locked down");
        Ok(Lockdown {
            backend: restrictor.name(),
        })
    }
}

/// The restrictor for the platform this binary was built for.
#[cfg(target_os = "linux")]
pub type PlatformRestrictor = LinuxRestrictor;

/// The restrictor for the platform this binary was built for.
#[cfg(target_os = "openbsd")]
pub type PlatformRestrictor = OpenBsdRestrictor;

/// The restrictor for the platform this binary was built for.
#[cfg(not(any(target_os = "linux", target_os = "openbsd")))]
pub type PlatformRestrictor = NoopRestrictor;

/// Returns true if the platform backend can enforce restrictions on this host.
pub fn enforcement_available() -> bool {
    #[cfg(target_os = "linux")]
    {
        landlock::abi_version().is_some()
    }

    #[cfg(target_os = "openbsd")]
    {
        true
    }

    #[cfg(not(any(target_os = "linux", target_os = "openbsd")))]
    {
        false
    }
}

/// Set once the syscall surface has been committed for this process.
#[cfg_attr(not(any(target_os = "linux", target_os = "openbsd")), allow(dead_code))]
static SEALED: AtomicBool = AtomicBool::new(false);

/// Fails if the process has already been sealed by an earlier commit.
#[cfg_attr(not(any(target_os = "linux", target_os = "openbsd")), allow(dead_code))]
fn ensure_unsealed(context: &str) -> Result<()> {
    if SEALED.load(Ordering::SeqCst) {
        return Err(SqliteUnsafeError::restriction_msg(
            context,
            "restrictions already sealed",
        ));
    }
    Ok(())
}

/// Marks the process as sealed; returns an error if it already was.
#[cfg_attr(not(any(target_os = "linux", target_os = "openbsd")), allow(dead_code))]
fn seal(context: &str) -> Result<()> {
    if SEALED.swap(true, Ordering::SeqCst) {
        return Err(SqliteUnsafeError::restriction_msg(
            context,
            "restrictions already sealed",
        ));
    }
    Ok(())
}
