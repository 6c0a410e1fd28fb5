//! Landlock filesystem isolation.
//!
//! Every filesystem access right known to the target ABI is handled by the
//! ruleset, so anything not granted beneath one of the paths is denied:
//! - `r` grants reading files and listing directories
//! - `w` grants writing and truncating existing files
//! - `c` grants creating and removing directory entries

use std::io;

use landlock::{
    Access, AccessFs, BitFlags, CompatLevel, Compatible, PathBeneath, PathFd, PathFdError,
    Ruleset, RulesetAttr, RulesetCreatedAttr, RulesetStatus, ABI,
};
use tracing::{debug, warn};

use super::{PathGrant, Permissions};
use crate::error::{Result, SqliteUnsafeError};

/// Newest ABI whose rights we ask for; older kernels get a best-effort subset.
const TARGET_ABI: ABI = ABI::V3;

/// `LANDLOCK_CREATE_RULESET_VERSION` from linux/landlock.h.
const CREATE_RULESET_VERSION: libc::c_uint = 1 << 0;

/// Returns the kernel's Landlock ABI version, or None if Landlock is off.
pub fn abi_version() -> Option<i64> {
    let ret = unsafe {
        libc::syscall(
            libc::SYS_landlock_create_ruleset,
            std::ptr::null::<libc::c_void>(),
            0usize,
            CREATE_RULESET_VERSION,
        )
    };
    if ret < 1 {
        None
    } else {
        Some(ret as i64)
    }
}

/// Maps unveil-style permissions onto Landlock access rights.
fn access_for(permissions: Permissions, abi: ABI) -> BitFlags<AccessFs> {
    let write = AccessFs::WriteFile | AccessFs::Truncate;
    let mut access = BitFlags::empty();

    if permissions.read {
        access |= AccessFs::from_read(abi) & !AccessFs::Execute;
    }
    if permissions.write {
        access |= write;
    }
    if permissions.create {
        access |= AccessFs::from_write(abi) & !write;
    }
    access
}

/// Opens `grant.path` and builds the rule granting its access rights.
///
/// A path that cannot be opened is a restriction error; it is never skipped.
fn path_rule(grant: &PathGrant, abi: ABI) -> Result<PathBeneath<PathFd>> {
    let fd = PathFd::new(&grant.path).map_err(|e| {
        SqliteUnsafeError::restriction(format!("landlock: {}", grant.path.display()), open_error(&e))
    })?;

    let mut access = access_for(grant.permissions, abi);
    // Directory rights on a plain file make the kernel reject the rule.
    if !grant.path.is_dir() {
        access &= AccessFs::from_file(abi);
    }
    Ok(PathBeneath::new(fd, access))
}

/// The OS error behind a failed open, so the message reads like errno.
fn open_error(err: &PathFdError) -> io::Error {
    std::error::Error::source(err)
        .and_then(|source| source.downcast_ref::<io::Error>())
        .and_then(io::Error::raw_os_error)
        .map(io::Error::from_raw_os_error)
        .unwrap_or_else(|| io::Error::other(err.to_string()))
}

/// Restricts the calling thread, and threads it spawns later, to the given
/// path grants.
///
/// Fails if a granted path cannot be opened or if the kernel does not enforce
/// the ruleset at all. Every path is opened before the ruleset is applied, so
/// a failure leaves the process unrestricted.
pub fn apply_path_rules(grants: &[PathGrant]) -> Result<()> {
    let abi = TARGET_ABI;

    let rules = grants
        .iter()
        .map(|grant| path_rule(grant, abi))
        .collect::<Result<Vec<_>>>()?;

    let mut ruleset = Ruleset::default()
        .set_compatibility(CompatLevel::BestEffort)
        .handle_access(AccessFs::from_all(abi))
        .and_then(|ruleset| ruleset.create())
        .map_err(|e| SqliteUnsafeError::restriction("landlock", io::Error::other(e.to_string())))?;

    for (grant, rule) in grants.iter().zip(rules) {
        ruleset = ruleset.add_rule(rule).map_err(|e| {
            SqliteUnsafeError::restriction(
                format!("landlock: {}", grant.path.display()),
                io::Error::other(e.to_string()),
            )
        })?;
        debug!(path = %grant.path.display(), perms = %grant.permissions, "Landlock rule added");
    }

    let status = ruleset
        .restrict_self()
        .map_err(|e| SqliteUnsafeError::restriction("landlock", io::Error::other(e.to_string())))?;

    match status.ruleset {
        RulesetStatus::FullyEnforced => debug!("Landlock rules fully enforced"),
        RulesetStatus::PartiallyEnforced => {
            warn!(abi = ?abi_version(), "Landlock rules only partially enforced by this kernel")
        }
        RulesetStatus::NotEnforced => {
            return Err(SqliteUnsafeError::restriction_msg(
                "landlock",
                "ruleset not enforced by this kernel",
            ))
        }
    }
    Ok(())
}
