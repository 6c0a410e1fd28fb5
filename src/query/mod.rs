//! Query execution and row output.
//!
//! [`run_query`] drives one [`Database`](crate::db::Database) from open to
//! close; [`RowFormatter`] renders rows the way the `sqlite3` shell's list
//! mode does, minus headers.

pub mod executor;
pub mod format;

pub use executor::run_query;
pub use format::RowFormatter;

/// Receives result rows one at a time, in engine order.
///
/// Visiting cannot stop the scan; a visitor that fails keeps its own error.
pub trait RowVisitor {
    /// Called once per row. `fields[i]` is None for SQL NULL.
    fn visit_row(&mut self, columns: &[&str], fields: &[Option<&[u8]>]);
}
