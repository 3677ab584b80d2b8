use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::PdoError;

/// One materialized result row: column names mapped to string values.
///
/// Every value is carried in its string form; SQL NULL reads as an empty string.
/// Column order follows the cursor.
///
/// When a result set repeats a column name, the last column carrying it wins for
/// [`Row::get`], [`Row::into_map`] and serialization, which emits one key per distinct
/// name. Positional access ([`Row::len`], [`Row::values`], [`Row::iter`]) still sees
/// every column, so `len` can exceed the number of serialized keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// The column names for this row (shared across all rows of a result set)
    column_names: Arc<Vec<String>>,
    /// The values for this row, in column order
    values: Vec<String>,
    // Name -> index lookup, shared across rows built from the same column list
    column_index: Arc<HashMap<String, usize>>,
}

impl Row {
    /// Create a row from column names and matching values.
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `values` - The values for this row
    ///
    /// # Errors
    /// Returns `PdoError::ColumnError` if there is not exactly one value per column.
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<String>) -> Result<Self, PdoError> {
        check_width(column_names.len(), values.len())?;
        let column_index = Arc::new(index_columns(&column_names));
        Ok(Self::with_index(column_names, values, column_index))
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        values: Vec<String>,
        column_index: Arc<HashMap<String, usize>>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Get a value by column name.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&str> {
        self.column_index
            .get(column_name)
            .and_then(|&idx| self.values.get(idx))
            .map(String::as_str)
    }

    /// Get a value by column position.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    /// Consume the row into a plain map.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, String> {
        let names = Arc::unwrap_or_clone(self.column_names);
        names.into_iter().zip(self.values).collect()
    }
}

pub(crate) fn check_width(columns: usize, values: usize) -> Result<(), PdoError> {
    if columns == values {
        Ok(())
    } else {
        Err(PdoError::ColumnError(format!(
            "{values} values for {columns} columns"
        )))
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.column_index.len()))?;
        for (idx, (column, value)) in self.iter().enumerate() {
            // earlier duplicates are shadowed by the last column of the same name
            if self.column_index.get(column) == Some(&idx) {
                map.serialize_entry(column, value)?;
            }
        }
        map.end()
    }
}
