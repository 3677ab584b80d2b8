use std::collections::HashMap;
use std::sync::Arc;

use crate::driver::{Cursor, RawValue};
use crate::error::PdoError;

use super::Rows;
use super::row::{Row, check_width, index_columns};

/// Build a [`Row`] from the cursor's current row.
///
/// Reads the column names, scans the raw buffers and decodes each as UTF-8 (invalid
/// sequences are replaced). NULL becomes an empty string. The cursor is left open.
///
/// # Errors
/// Returns `PdoError::ColumnError` if the cursor cannot describe its columns, or the
/// driver's error if scanning the row fails.
pub fn materialize_row(cursor: &dyn Cursor) -> Result<Row, PdoError> {
    let column_names = cursor
        .columns()
        .map_err(|e| PdoError::ColumnError(e.to_string()))?;
    let column_index = Arc::new(index_columns(&column_names));
    build_row(cursor, column_names, column_index)
}

/// Drain `cursor` into [`Rows`]. The cursor is left open for the caller to close.
///
/// # Errors
/// Returns `PdoError` if advancing, introspecting or scanning the cursor fails.
pub async fn collect_rows(cursor: &mut dyn Cursor) -> Result<Rows, PdoError> {
    let column_names = cursor
        .columns()
        .map_err(|e| PdoError::ColumnError(e.to_string()))?;
    // Shared by every row of this result set
    let column_index = Arc::new(index_columns(&column_names));

    let mut rows = Rows::new();
    while cursor.advance().await? {
        rows.push(build_row(
            &*cursor,
            Arc::clone(&column_names),
            Arc::clone(&column_index),
        )?);
    }
    Ok(rows)
}

fn build_row(
    cursor: &dyn Cursor,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
) -> Result<Row, PdoError> {
    let raw = cursor.scan()?;
    check_width(column_names.len(), raw.len())?;
    let values = raw.into_iter().map(decode_value).collect();
    Ok(Row::with_index(column_names, values, column_index))
}

fn decode_value(raw: RawValue) -> String {
    match raw {
        Some(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        },
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    use crate::driver::RawRow;

    struct ScriptedCursor {
        columns: Option<Arc<Vec<String>>>,
        pending: VecDeque<RawRow>,
        current: Option<RawRow>,
    }

    #[async_trait]
    impl Cursor for ScriptedCursor {
        fn columns(&self) -> Result<Arc<Vec<String>>, PdoError> {
            self.columns
                .clone()
                .ok_or_else(|| PdoError::Other("cursor closed".into()))
        }

        async fn advance(&mut self) -> Result<bool, PdoError> {
            self.current = self.pending.pop_front();
            Ok(self.current.is_some())
        }

        fn scan(&self) -> Result<RawRow, PdoError> {
            self.current
                .clone()
                .ok_or_else(|| PdoError::Other("no current row".into()))
        }

        async fn close(&mut self) -> Result<(), PdoError> {
            Ok(())
        }
    }

    fn cursor(rows: Vec<RawRow>) -> ScriptedCursor {
        ScriptedCursor {
            columns: Some(Arc::new(vec!["id".into(), "name".into()])),
            pending: rows.into(),
            current: None,
        }
    }

    #[tokio::test]
    async fn null_and_empty_both_become_empty_string() {
        let mut c = cursor(vec![
            vec![Some(b"1".to_vec()), None],
            vec![Some(b"2".to_vec()), Some(Vec::new())],
        ]);
        let rows = collect_rows(&mut c).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(""));
        assert_eq!(rows[1].get("name"), Some(""));
        assert_eq!(rows[1].get("id"), Some("2"));
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let mut c = cursor(vec![vec![Some(b"1".to_vec()), Some(vec![0x66, 0xff, 0x6f])]]);
        assert!(c.advance().await.unwrap());
        let row = materialize_row(&c).unwrap();
        assert_eq!(row.get("name"), Some("f\u{fffd}o"));
    }

    #[test]
    fn missing_columns_is_a_column_error() {
        let c = ScriptedCursor {
            columns: None,
            pending: VecDeque::new(),
            current: None,
        };
        let err = materialize_row(&c).unwrap_err();
        assert!(matches!(err, PdoError::ColumnError(_)));
    }

    #[tokio::test]
    async fn width_mismatch_is_rejected() {
        let mut c = cursor(vec![vec![Some(b"1".to_vec())]]);
        let err = collect_rows(&mut c).await.unwrap_err();
        assert!(matches!(err, PdoError::ColumnError(_)));
    }
}
