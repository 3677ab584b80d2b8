//! Result rows and the materializer that builds them from driver cursors.

mod materialize;
mod row;

pub use materialize::{collect_rows, materialize_row};
pub use row::Row;

/// Rows of a result set, in cursor order.
pub type Rows = Vec<Row>;
