//! unveil(2) and pledge(2) backend.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tracing::debug;

use super::{ensure_unsealed, seal, PathGrant, Promises, Restrictor};
use crate::error::{Result, SqliteUnsafeError};

#[derive(Debug, Default)]
pub struct OpenBsdRestrictor {
    _private: (),
}

impl OpenBsdRestrictor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Restrictor for OpenBsdRestrictor {
    fn name(&self) -> &'static str {
        "pledge"
    }

    fn restrict_paths(&mut self, grants: &[PathGrant]) -> Result<()> {
        ensure_unsealed("unveil")?;
        for grant in grants {
            unveil(&grant.path, &grant.permissions.to_string())?;
            debug!(path = %grant.path.display(), perms = %grant.permissions, "unveiled");
        }
        Ok(())
    }

    fn restrict_syscalls(&mut self, promises: &Promises) -> Result<()> {
        ensure_unsealed("pledge")?;
        // Without the "unveil" promise, pledge also locks the unveil list.
        pledge(&promises.to_string())?;
        seal("pledge")
    }
}

fn unveil(path: &Path, perms: &str) -> Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| SqliteUnsafeError::path(path, "path contains a NUL byte"))?;
    let c_perms = CString::new(perms)
        .map_err(|_| SqliteUnsafeError::restriction_msg("unveil", "invalid permissions"))?;

    let ret = unsafe { libc::unveil(c_path.as_ptr(), c_perms.as_ptr()) };
    if ret == -1 {
        return Err(SqliteUnsafeError::restriction(
            format!("unveil: {}", path.display()),
            io::Error::last_os_error(),
        ));
    }
    Ok(())
}

fn pledge(promises: &str) -> Result<()> {
    let c_promises = CString::new(promises)
        .map_err(|_| SqliteUnsafeError::restriction_msg("pledge", "invalid promises"))?;

    let ret = unsafe { libc::pledge(c_promises.as_ptr(), std::ptr::null()) };
    if ret == -1 {
        return Err(SqliteUnsafeError::restriction(
            "pledge",
            io::Error::last_os_error(),
        ));
    }
    Ok(())
}
