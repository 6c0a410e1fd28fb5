//! Connection flags set through `sqlite3_db_config`.
//!
//! sqlx exposes no API for these, so they are applied on the raw handle.

use std::ffi::CStr;
use std::os::raw::c_int;
use std::ptr::NonNull;

use libsqlite3_sys as ffi;

use crate::error::{Result, SqliteUnsafeError};

/// A boolean connection flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbFlag {
    /// `SQLITE_DBCONFIG_DEFENSIVE`: refuses features that can corrupt the file.
    Defensive,
    /// `SQLITE_DBCONFIG_WRITABLE_SCHEMA`: allows writes to `sqlite_schema`.
    WritableSchema,
}

impl DbFlag {
    fn op(self) -> c_int {
        match self {
            Self::Defensive => ffi::SQLITE_DBCONFIG_DEFENSIVE,
            Self::WritableSchema => ffi::SQLITE_DBCONFIG_WRITABLE_SCHEMA,
        }
    }
}

/// Flag values the query will run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardeningState {
    pub defensive: bool,
    pub writable_schema: bool,
}

impl HardeningState {
    /// The configuration every query runs under.
    pub const QUERY: Self = Self {
        defensive: false,
        writable_schema: true,
    };
}

/// Sets `flag` to `value` (or only reads it when `value` is None) and
/// returns the resulting setting.
///
/// # Safety
///
/// `db` must be a live connection handle that no other thread uses for the
/// duration of the call.
pub unsafe fn db_config(db: NonNull<ffi::sqlite3>, flag: DbFlag, value: Option<bool>) -> Result<bool> {
    let requested: c_int = match value {
        Some(true) => 1,
        Some(false) => 0,
        None => -1,
    };
    let mut current: c_int = 0;

    let rc = ffi::sqlite3_db_config(db.as_ptr(), flag.op(), requested, &mut current as *mut c_int);
    if rc != ffi::SQLITE_OK {
        return Err(SqliteUnsafeError::config(errmsg(db)));
    }
    Ok(current != 0)
}

/// Applies `state` to the connection.
///
/// # Safety
///
/// Same contract as [`db_config`].
pub unsafe fn apply(db: NonNull<ffi::sqlite3>, state: HardeningState) -> Result<HardeningState> {
    let defensive = db_config(db, DbFlag::Defensive, Some(state.defensive))?;
    let writable_schema = db_config(db, DbFlag::WritableSchema, Some(state.writable_schema))?;
    Ok(HardeningState {
        defensive,
        writable_schema,
    })
}

/// Reads the current flag values.
///
/// # Safety
///
/// Same contract as [`db_config`].
pub unsafe fn read(db: NonNull<ffi::sqlite3>) -> Result<HardeningState> {
    Ok(HardeningState {
        defensive: db_config(db, DbFlag::Defensive, None)?,
        writable_schema: db_config(db, DbFlag::WritableSchema, None)?,
    })
}

unsafe fn errmsg(db: NonNull<ffi::sqlite3>) -> String {
    let msg = ffi::sqlite3_errmsg(db.as_ptr());
    if msg.is_null() {
        return "unknown error".to_string();
    }
    CStr::from_ptr(msg).to_string_lossy().into_owned()
}
