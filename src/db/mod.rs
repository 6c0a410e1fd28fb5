//! SQLite handle for a single query run.
//!
//! A [`Database`] moves through `Opened → Configured → Executing` and is
//! consumed by [`Database::close`]. Dropping it without closing still releases
//! the connection, so engine locks never outlive the handle.

mod hardening;

pub use hardening::{DbFlag, HardeningState};

use std::path::{Path, PathBuf};

use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row};
use tracing::debug;

use crate::error::{Result, SqliteUnsafeError};
use crate::query::RowVisitor;
use crate::sandbox::Lockdown;

/// Lifecycle position of an open handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opened,
    Configured,
    Executing,
}

/// Exclusive owner of the connection to the target file.
#[derive(Debug)]
pub struct Database {
    conn: SqliteConnection,
    path: PathBuf,
    phase: Phase,
}

impl Database {
    /// Connection options matching a plain `sqlite3_open` of `path`.
    pub fn connect_options(path: &Path) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(false)
            .disable_statement_logging()
    }

    /// Opens `path`. Requires proof that the process is already locked down.
    pub async fn open(path: &Path, lockdown: &Lockdown) -> Result<Self> {
        let conn = Self::connect_options(path)
            .connect()
            .await
            .map_err(|e| SqliteUnsafeError::open(path, engine_message(&e)))?;

        debug!(path = %path.display(), backend = lockdown.backend(), "Database opened");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            phase: Phase::Opened,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Applies [`HardeningState::QUERY`] to the handle.
    pub async fn harden(&mut self) -> Result<HardeningState> {
        let mut handle = self
            .conn
            .lock_handle()
            .await
            .map_err(|e| SqliteUnsafeError::config(engine_message(&e)))?;

        // The lock keeps sqlx's worker off the handle for the duration.
        let state = unsafe { hardening::apply(handle.as_raw_handle(), HardeningState::QUERY)? };
        drop(handle);

        debug!(?state, "Connection hardened");
        self.phase = Phase::Configured;
        Ok(state)
    }

    /// Reads the current hardening flags from the handle.
    pub async fn hardening_state(&mut self) -> Result<HardeningState> {
        let mut handle = self
            .conn
            .lock_handle()
            .await
            .map_err(|e| SqliteUnsafeError::config(engine_message(&e)))?;

        unsafe { hardening::read(handle.as_raw_handle()) }
    }

    /// Runs `sql` as given and hands every result row to `visitor`.
    ///
    /// The text may hold several statements; they run in order until the
    /// first failure. Returns the number of rows visited.
    pub async fn execute<V>(&mut self, sql: &str, visitor: &mut V) -> Result<u64>
    where
        V: RowVisitor + ?Sized,
    {
        if self.phase != Phase::Configured {
            return Err(SqliteUnsafeError::exec(format!(
                "handle is {:?}, not configured",
                self.phase
            )));
        }
        self.phase = Phase::Executing;

        let mut rows = sqlx::raw_sql(sql).fetch(&mut self.conn);
        let mut count = 0u64;

        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| SqliteUnsafeError::exec(engine_message(&e)))?
        {
            visit_row(&row, visitor)?;
            count += 1;
        }

        debug!(rows = count, "Query finished");
        Ok(count)
    }

    /// Closes the connection, releasing engine locks and descriptors.
    pub async fn close(self) -> Result<()> {
        debug!(path = %self.path.display(), phase = ?self.phase, "Closing database");
        self.conn
            .close()
            .await
            .map_err(|e| SqliteUnsafeError::close(engine_message(&e)))
    }
}

fn visit_row<V>(row: &SqliteRow, visitor: &mut V) -> Result<()>
where
    V: RowVisitor + ?Sized,
{
    let columns: Vec<&str> = row.columns().iter().map(|col| col.name()).collect();

    let mut fields: Vec<Option<&[u8]>> = Vec::with_capacity(row.len());
    for index in 0..row.len() {
        // Unchecked decoding lets SQLite render numbers as text, like
        // sqlite3_column_text does.
        let field: Option<&[u8]> = row
            .try_get_unchecked(index)
            .map_err(|e| SqliteUnsafeError::exec(engine_message(&e)))?;
        fields.push(field);
    }

    visitor.visit_row(&columns, &fields);
    Ok(())
}

/// The engine's own message for `err`, without sqlx's decoration.
pub fn engine_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}
