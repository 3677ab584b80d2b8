//! PDO-style data access over a pluggable async SQL driver.
//!
//! A [`Pdo`] handle names a driver and a data source. Statements prepared from it substitute
//! named placeholders textually (see [`query_builder`]) and return rows as column-name to
//! string mappings.
//!
//! ```rust,no_run
//! use sql_pdo::prelude::*;
//!
//! # async fn demo() -> Result<(), PdoError> {
//! let pdo = Pdo::new("sqlite", "app.db")?;
//! pdo.exec("CREATE TABLE IF NOT EXISTS users (id INTEGER, name TEXT)").await?;
//!
//! let mut stmt = pdo.prepare("SELECT name FROM users WHERE id = :id").await?;
//! stmt.bind_value(":id", "1");
//! while let Some(row) = stmt.fetch().await? {
//!     println!("{}", row.get("name").unwrap_or_default());
//! }
//! # Ok(()) }
//! ```

pub mod driver;
pub mod error;
pub mod hello;
pub mod pdo;
pub mod prelude;
pub mod query_builder;
pub mod results;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod statement;

pub use error::PdoError;
pub use pdo::{Pdo, PdoOptions};
pub use query_builder::{Arguments, build_query};
pub use results::{Row, Rows};
pub use statement::PdoStatement;
