//! Generic SQL driver seam.
//!
//! A [`Driver`] opens [`Connection`]s from a data source string; a connection runs statements
//! directly, manages a single transaction and hands out [`Cursor`]s that yield rows one at a
//! time as untyped byte buffers. The PDO layer only ever talks to these traits, so any backend
//! that can be expressed this way can be registered in a [`DriverRegistry`].

mod registry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PdoError;

pub use registry::DriverRegistry;

/// One column value as scanned from a cursor. `None` is SQL NULL.
pub type RawValue = Option<Vec<u8>>;

/// All column values of the cursor's current row, in column order.
pub type RawRow = Vec<RawValue>;

/// Opens connections for a data source.
#[async_trait]
pub trait Driver: std::fmt::Debug + Send + Sync {
    /// Name the driver is registered under by default (e.g. `"sqlite"`).
    fn name(&self) -> &str;

    /// Open a fresh connection to `dsn`.
    ///
    /// # Errors
    /// Returns `PdoError` if the data source cannot be opened.
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>, PdoError>;
}

/// A live connection returned by [`Driver::open`].
#[async_trait]
pub trait Connection: Send {
    /// Run a row-returning statement and return a cursor positioned before the first row.
    ///
    /// # Errors
    /// Returns `PdoError` if the statement cannot be prepared or run.
    async fn query(&mut self, sql: &str) -> Result<Box<dyn Cursor>, PdoError>;

    /// Run a mutating statement and return the affected-row count reported by the backend.
    ///
    /// # Errors
    /// Returns `PdoError` if the statement cannot be prepared or run.
    async fn exec(&mut self, sql: &str) -> Result<u64, PdoError>;

    /// # Errors
    /// Returns `PdoError` if the backend refuses to start a transaction.
    async fn begin(&mut self) -> Result<(), PdoError>;

    /// # Errors
    /// Returns `PdoError` if the backend fails to commit.
    async fn commit(&mut self) -> Result<(), PdoError>;

    /// # Errors
    /// Returns `PdoError` if the backend fails to roll back.
    async fn rollback(&mut self) -> Result<(), PdoError>;

    /// Release the connection. Further use is an error.
    ///
    /// # Errors
    /// Returns `PdoError` if the backend reports a failure while closing.
    async fn close(&mut self) -> Result<(), PdoError>;
}

/// Row-at-a-time access to a result set.
#[async_trait]
pub trait Cursor: Send {
    /// Column names of the result set, in order.
    ///
    /// # Errors
    /// Returns `PdoError` if the cursor can no longer describe its columns (e.g. it was closed).
    fn columns(&self) -> Result<Arc<Vec<String>>, PdoError>;

    /// Move to the next row. Returns `false` once the result set is exhausted.
    ///
    /// # Errors
    /// Returns `PdoError` if reading the next row fails.
    async fn advance(&mut self) -> Result<bool, PdoError>;

    /// Scan the current row into raw byte buffers.
    ///
    /// # Errors
    /// Returns `PdoError` if there is no current row.
    fn scan(&self) -> Result<RawRow, PdoError>;

    /// # Errors
    /// Returns `PdoError` if the backend reports a failure while closing.
    async fn close(&mut self) -> Result<(), PdoError>;
}
