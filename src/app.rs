//! Core orchestrator for sqlite-unsafe.
//!
//! Order matters here: the restriction set is committed before the database
//! is opened, and nothing reads the query text before that.

use std::io::Write;

use tracing::{debug, info};

use crate::cli::Invocation;
use crate::error::{Result, SqliteUnsafeError};
use crate::query::{run_query, RowFormatter};
use crate::sandbox::{RestrictionSet, Restrictor};

/// Locks the process down through `restrictor`, then runs the query and
/// writes its rows to `out`. Returns the number of rows written.
pub fn run<R, W>(invocation: &Invocation, restrictor: &mut R, out: W) -> Result<u64>
where
    R: Restrictor + ?Sized,
    W: Write,
{
    let restrictions = RestrictionSet::for_database(&invocation.file)?;

    // Built before lockdown; a current-thread runtime spawns no threads yet.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SqliteUnsafeError::internal(format!("runtime: {e}")))?;

    let lockdown = restrictions.commit(restrictor)?;
    debug!(backend = lockdown.backend(), "Running query");

    let mut formatter = RowFormatter::new(out);
    let result = runtime.block_on(run_query(
        &invocation.file,
        &invocation.sql,
        &lockdown,
        &mut formatter,
    ));

    // Rows printed before a failure are still flushed.
    let flushed = formatter.finish();
    let rows = result?;
    flushed.map_err(SqliteUnsafeError::Output)?;

    info!(rows, "Done");
    Ok(rows)
}
