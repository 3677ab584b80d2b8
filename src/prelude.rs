//! Convenient imports for common functionality.

pub use crate::driver::{Connection, Cursor, Driver, DriverRegistry, RawRow, RawValue};
pub use crate::error::PdoError;
pub use crate::pdo::{Pdo, PdoOptions, PdoOptionsBuilder};
pub use crate::query_builder::{Arguments, build_query};
pub use crate::results::{Row, Rows};
pub use crate::statement::PdoStatement;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteDriver, SqliteOptions};
