//! Pipe-separated row output.

use std::io::{self, Write};

use super::RowVisitor;

const FIELD_SEPARATOR: &[u8] = b"|";
const ROW_TERMINATOR: &[u8] = b"\n";

/// Writes each row as its fields joined by `|` and ended by a newline.
///
/// NULL renders as nothing. Column names are not printed. The first write
/// error is kept and later rows are dropped; [`RowFormatter::finish`] reports
/// it.
pub struct RowFormatter<W: Write> {
    out: W,
    error: Option<io::Error>,
    rows: u64,
}

impl<W: Write> RowFormatter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            error: None,
            rows: 0,
        }
    }

    /// Rows written so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flushes the output and returns the writer, or the first write error.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_row(&mut self, fields: &[Option<&[u8]>]) -> io::Result<()> {
        for (i, field) in fields.iter().enumerate() {
            if let Some(bytes) = field {
                self.out.write_all(bytes)?;
            }
            let end = if i + 1 < fields.len() {
                FIELD_SEPARATOR
            } else {
                ROW_TERMINATOR
            };
            self.out.write_all(end)?;
        }
        Ok(())
    }
}

impl<W: Write> RowVisitor for RowFormatter<W> {
    fn visit_row(&mut self, _columns: &[&str], fields: &[Option<&[u8]>]) {
        if self.error.is_some() {
            return;
        }
        match self.write_row(fields) {
            Ok(()) => self.rows += 1,
            Err(err) => self.error = Some(err),
        }
    }
}
