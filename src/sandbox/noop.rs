//! Restrictor for platforms without a native lockdown primitive.

use tracing::warn;

use super::{PathGrant, Promises, Restrictor};
use crate::error::Result;

/// Accepts every commit and enforces nothing.
///
/// Used where the OS offers no path or syscall restriction, and by tests that
/// must not lock down the test process itself.
#[derive(Debug, Default)]
pub struct NoopRestrictor {
    _private: (),
}

impl NoopRestrictor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Restrictor for NoopRestrictor {
    fn name(&self) -> &'static str {
        "none"
    }

    fn restrict_paths(&mut self, grants: &[PathGrant]) -> Result<()> {
        warn!(
            count = grants.len(),
            "No path restriction available on this platform; filesystem stays unrestricted"
        );
        Ok(())
    }

    fn restrict_syscalls(&mut self, promises: &Promises) -> Result<()> {
        warn!(
            %promises,
            "No syscall restriction available on this platform; syscalls stay unrestricted"
        );
        Ok(())
    }
}
