//! One query, start to finish.

use std::path::Path;

use tracing::warn;

use super::RowVisitor;
use crate::db::Database;
use crate::error::Result;
use crate::sandbox::Lockdown;

/// Opens `path`, hardens the handle, runs `sql` through `visitor`, and closes.
///
/// Once the handle is open it is closed on every path. When the query itself
/// failed, that error is returned and a close failure is only logged.
pub async fn run_query<V>(path: &Path, sql: &str, lockdown: &Lockdown, visitor: &mut V) -> Result<u64>
where
    V: RowVisitor + ?Sized,
{
    let mut db = Database::open(path, lockdown).await?;

    let outcome = harden_and_execute(&mut db, sql, visitor).await;
    let closed = db.close().await;

    match outcome {
        Ok(rows) => closed.map(|()| rows),
        Err(err) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "Close failed after query error");
            }
            Err(err)
        }
    }
}

async fn harden_and_execute<V>(db: &mut Database, sql: &str, visitor: &mut V) -> Result<u64>
where
    V: RowVisitor + ?Sized,
{
    db.harden().await?;
    db.execute(sql, visitor).await
}
