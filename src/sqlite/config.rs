use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::driver::{Connection, Driver};
use crate::error::PdoError;

use super::connection::SqliteConnection;

/// Shared handle to a rusqlite connection, locked from blocking tasks.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Options applied to every connection the `SQLite` driver opens.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub busy_timeout: Duration,
    pub wal: bool,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            wal: false,
        }
    }
}

impl SqliteOptions {
    #[must_use]
    pub fn builder() -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::default()
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone, Default)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.opts.busy_timeout = busy_timeout;
        self
    }

    /// Switch each opened connection to WAL journaling.
    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a driver with these options.
    #[must_use]
    pub fn build(self) -> SqliteDriver {
        SqliteDriver::new(self.finish())
    }
}

/// `SQLite` driver backed by rusqlite. The data source is a file path or `SQLite` URI.
#[derive(Debug, Clone, Default)]
pub struct SqliteDriver {
    opts: SqliteOptions,
}

impl SqliteDriver {
    #[must_use]
    pub fn new(opts: SqliteOptions) -> Self {
        Self { opts }
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.opts
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>, PdoError> {
        let dsn = dsn.to_owned();
        let opts = self.opts.clone();
        let conn = tokio::task::spawn_blocking(move || open_blocking(&dsn, &opts))
            .await
            .map_err(|e| {
                PdoError::ConnectionError(format!("sqlite spawn_blocking join error: {e}"))
            })??;
        Ok(Box::new(SqliteConnection::new(Arc::new(Mutex::new(conn)))))
    }
}

fn open_blocking(dsn: &str, opts: &SqliteOptions) -> Result<rusqlite::Connection, PdoError> {
    let conn = rusqlite::Connection::open(dsn)
        .map_err(|e| PdoError::ConnectionError(format!("failed to open {dsn}: {e}")))?;
    conn.busy_timeout(opts.busy_timeout)?;
    if opts.wal {
        let _mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    }
    tracing::trace!(dsn, "sqlite connection opened");
    Ok(conn)
}
