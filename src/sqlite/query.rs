use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Statement;
use rusqlite::types::ValueRef;

use crate::driver::{Cursor, RawRow, RawValue};
use crate::error::PdoError;

/// Extract one column of a `SQLite` row as raw bytes.
///
/// Integers and reals are rendered in decimal text form; text and blobs are passed
/// through as their bytes; NULL is `None`.
///
/// # Errors
///
/// Returns `PdoError` if the column cannot be read.
pub fn sqlite_extract_raw(row: &rusqlite::Row, idx: usize) -> Result<RawValue, PdoError> {
    let value = row.get_ref(idx)?;
    Ok(match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string().into_bytes()),
        ValueRef::Real(f) => Some(f.to_string().into_bytes()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(t.to_vec()),
    })
}

/// Run `stmt` and read its whole result into a [`SqliteCursor`].
///
/// # Errors
/// Returns `PdoError` if executing the statement or reading a row fails.
pub fn build_cursor(stmt: &mut Statement) -> Result<SqliteCursor, PdoError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut pending = VecDeque::new();
    let mut rows_iter = stmt.query([])?;
    while let Some(row) = rows_iter.next()? {
        let mut raw = Vec::with_capacity(col_count);
        for i in 0..col_count {
            raw.push(sqlite_extract_raw(row, i)?);
        }
        pending.push_back(raw);
    }

    Ok(SqliteCursor {
        columns: Some(Arc::new(column_names)),
        pending,
        current: None,
    })
}

/// Cursor over a `SQLite` result that was read inside the blocking task.
///
/// The whole result is buffered when the query runs: memory grows with the result
/// size, and later writes by other connections are not seen by an open cursor.
#[derive(Debug)]
pub struct SqliteCursor {
    columns: Option<Arc<Vec<String>>>,
    pending: VecDeque<RawRow>,
    current: Option<RawRow>,
}

#[async_trait]
impl Cursor for SqliteCursor {
    fn columns(&self) -> Result<Arc<Vec<String>>, PdoError> {
        self.columns
            .clone()
            .ok_or_else(|| PdoError::ColumnError("SQLite cursor is closed".into()))
    }

    async fn advance(&mut self) -> Result<bool, PdoError> {
        self.current = self.pending.pop_front();
        Ok(self.current.is_some())
    }

    fn scan(&self) -> Result<RawRow, PdoError> {
        self.current
            .clone()
            .ok_or_else(|| PdoError::ExecutionError("SQLite cursor has no current row".into()))
    }

    async fn close(&mut self) -> Result<(), PdoError> {
        self.columns = None;
        self.pending.clear();
        self.current = None;
        Ok(())
    }
}
