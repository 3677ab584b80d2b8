use std::fmt;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{Connection, Cursor};
use crate::error::PdoError;

use super::config::SharedSqliteConnection;
use super::query::build_cursor;

const ROLLBACK_BUSY_RETRIES: &[Duration] = &[
    Duration::from_millis(10),
    Duration::from_millis(25),
    Duration::from_millis(50),
];

/// A single rusqlite connection driven from blocking tasks.
pub struct SqliteConnection {
    conn: Option<SharedSqliteConnection>,
    in_transaction: bool,
}

impl SqliteConnection {
    pub(crate) fn new(conn: SharedSqliteConnection) -> Self {
        Self {
            conn: Some(conn),
            in_transaction: false,
        }
    }

    fn conn_handle(&self) -> Result<SharedSqliteConnection, PdoError> {
        self.conn
            .clone()
            .ok_or_else(|| PdoError::ConnectionError("SQLite connection already closed".into()))
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("open", &self.conn.is_some())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

pub(crate) async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, PdoError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, PdoError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| PdoError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

fn rollback_with_busy_retries(conn: &mut rusqlite::Connection) -> Result<(), PdoError> {
    for (idx, delay) in ROLLBACK_BUSY_RETRIES.iter().copied().enumerate() {
        match conn.execute_batch("ROLLBACK") {
            Ok(()) => return Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    && idx + 1 < ROLLBACK_BUSY_RETRIES.len() =>
            {
                thread::sleep(delay);
            }
            Err(err) => return Err(PdoError::SqliteError(err)),
        }
    }

    Err(PdoError::ExecutionError("rollback retries exhausted".into()))
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn query(&mut self, sql: &str) -> Result<Box<dyn Cursor>, PdoError> {
        let sql_owned = sql.to_owned();
        let cursor = run_blocking(self.conn_handle()?, move |guard| {
            let mut stmt = guard.prepare(&sql_owned)?;
            build_cursor(&mut stmt)
        })
        .await?;
        Ok(Box::new(cursor))
    }

    async fn exec(&mut self, sql: &str) -> Result<u64, PdoError> {
        let sql_owned = sql.to_owned();
        run_blocking(self.conn_handle()?, move |guard| {
            let affected = guard.execute(&sql_owned, [])?;
            u64::try_from(affected)
                .map_err(|e| PdoError::ExecutionError(format!("affected rows overflow: {e}")))
        })
        .await
    }

    async fn begin(&mut self) -> Result<(), PdoError> {
        if self.in_transaction {
            return Err(PdoError::ExecutionError(
                "SQLite transaction already in progress".into(),
            ));
        }
        run_blocking(self.conn_handle()?, |guard| {
            guard.execute_batch("BEGIN").map_err(PdoError::SqliteError)
        })
        .await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), PdoError> {
        if !self.in_transaction {
            return Err(PdoError::ExecutionError("SQLite transaction not active".into()));
        }
        run_blocking(self.conn_handle()?, |guard| {
            guard.execute_batch("COMMIT").map_err(PdoError::SqliteError)
        })
        .await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), PdoError> {
        if !self.in_transaction {
            return Err(PdoError::ExecutionError("SQLite transaction not active".into()));
        }
        let result = run_blocking(self.conn_handle()?, |guard| {
            // A failed COMMIT may already have ended the transaction
            if guard.is_autocommit() {
                return Ok(());
            }
            rollback_with_busy_retries(guard)
        })
        .await;
        self.in_transaction = false;
        result
    }

    async fn close(&mut self) -> Result<(), PdoError> {
        let Some(handle) = self.conn.take() else {
            return Ok(());
        };
        self.in_transaction = false;
        // Other clones of the handle only exist inside finished blocking tasks
        tokio::task::spawn_blocking(move || drop(handle))
            .await
            .map_err(|e| PdoError::ConnectionError(format!("sqlite close join error: {e}")))?;
        tracing::trace!("sqlite connection closed");
        Ok(())
    }
}
