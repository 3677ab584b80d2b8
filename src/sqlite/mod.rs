// SQLite backend - the built-in driver behind the `sqlite` feature
//
// - config: driver options and the `Driver` implementation
// - connection: blocking rusqlite access and transaction control
// - query: result extraction into a buffered cursor

pub mod config;
pub mod connection;
pub mod query;

pub use config::{SqliteDriver, SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteConnection;
pub use query::SqliteCursor;
