use std::fmt;

use crate::driver::{Connection, Cursor};
use crate::error::PdoError;
use crate::pdo::{Pdo, release};
use crate::query_builder::{Arguments, build_query};
use crate::results::{Row, Rows, materialize_row};

/// A SQL template prepared from a [`Pdo`] handle.
///
/// Bound arguments are substituted into the statement text before each operation.
/// Substitution rewrites the stored text: once a placeholder has been replaced it is gone,
/// so binding the same name again afterwards has no effect.
///
/// Operations other than [`PdoStatement::fetch`] go through the owning handle and so see
/// its current transaction. `fetch` always reads over a connection of its own.
pub struct PdoStatement {
    sql: String,
    pdo: Pdo,
    args: Arguments,
    fetch: FetchState,
}

enum FetchState {
    NotStarted,
    Open {
        conn: Box<dyn Connection>,
        cursor: Box<dyn Cursor>,
    },
    Exhausted,
}

impl PdoStatement {
    pub(crate) fn new(sql: &str, pdo: Pdo) -> Self {
        Self {
            sql: sql.to_owned(),
            pdo,
            args: Arguments::new(),
            fetch: FetchState::NotStarted,
        }
    }

    /// Current statement text, with every substitution made so far.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn bound_arguments(&self) -> &Arguments {
        &self.args
    }

    /// Bind one placeholder for later substitution.
    pub fn bind_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.args.insert(name.into(), value.into());
    }

    /// Substitute `args` and then the bound arguments into the statement text.
    ///
    /// Nothing is sent to the database; always returns `true`.
    pub fn execute(&mut self, args: &Arguments) -> bool {
        self.sql = build_query(&self.sql, args);
        self.apply_bound();
        true
    }

    /// Run the statement as DML through the owning handle.
    ///
    /// # Errors
    /// Returns `PdoError` if the handle fails to execute the statement.
    pub async fn exec(&mut self) -> Result<u64, PdoError> {
        self.apply_bound();
        self.pdo.exec(&self.sql).await
    }

    /// Run the statement through the owning handle and return every row.
    ///
    /// # Errors
    /// Returns `PdoError` if the handle fails to run the query.
    pub async fn fetch_all(&mut self) -> Result<Rows, PdoError> {
        self.apply_bound();
        self.pdo.query(&self.sql).await
    }

    /// Return the next row, or `None` once the result is exhausted.
    ///
    /// The first call opens a dedicated connection and cursor; they are closed when the last
    /// row has been read. Calls after exhaustion keep returning `None`.
    ///
    /// Whether rows are streamed is up to the driver. The `SQLite` driver reads the whole
    /// result on the first call, so the rows are a snapshot taken at that point and the
    /// full result is held in memory until the fetch ends.
    ///
    /// # Errors
    /// Returns `PdoError` if opening, advancing or reading the cursor fails. A failure while
    /// advancing closes the cursor and ends the fetch.
    pub async fn fetch(&mut self) -> Result<Option<Row>, PdoError> {
        self.apply_bound();

        if matches!(self.fetch, FetchState::NotStarted) {
            let mut conn = self.pdo.open_connection().await?;
            let cursor = match conn.query(&self.sql).await {
                Ok(cursor) => cursor,
                Err(err) => {
                    self.fetch = FetchState::Exhausted;
                    return release(conn, Err(err)).await;
                }
            };
            self.fetch = FetchState::Open { conn, cursor };
        }

        let step = match &mut self.fetch {
            FetchState::Open { cursor, .. } => match cursor.advance().await {
                Ok(true) => return materialize_row(&**cursor).map(Some),
                Ok(false) => Ok(()),
                Err(err) => Err(err),
            },
            FetchState::NotStarted | FetchState::Exhausted => return Ok(None),
        };

        self.finish_fetch(step).await?;
        Ok(None)
    }

    /// Number of rows the statement returns. Only meaningful for row-returning statements.
    ///
    /// # Errors
    /// Returns `PdoError` if the handle fails to run the query.
    pub async fn row_count(&mut self) -> Result<usize, PdoError> {
        Ok(self.fetch_all().await?.len())
    }

    /// Number of columns in the first returned row.
    ///
    /// # Errors
    /// Returns `PdoError::EmptyResultSet` if the statement returns no rows, or the handle's
    /// error if the query fails.
    pub async fn column_count(&mut self) -> Result<usize, PdoError> {
        let rows = self.fetch_all().await?;
        rows.first().map(Row::len).ok_or(PdoError::EmptyResultSet)
    }

    fn apply_bound(&mut self) {
        if !self.args.is_empty() {
            self.sql = build_query(&self.sql, &self.args);
        }
    }

    async fn finish_fetch(&mut self, step: Result<(), PdoError>) -> Result<(), PdoError> {
        if let FetchState::Open { conn, mut cursor } =
            std::mem::replace(&mut self.fetch, FetchState::Exhausted)
        {
            let closed = cursor.close().await;
            return release(conn, step.and(closed)).await;
        }
        step
    }
}

impl fmt::Debug for PdoStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fetch = match self.fetch {
            FetchState::NotStarted => "not started",
            FetchState::Open { .. } => "open",
            FetchState::Exhausted => "exhausted",
        };
        f.debug_struct("PdoStatement")
            .field("sql", &self.sql)
            .field("pdo", &self.pdo)
            .field("args", &self.args)
            .field("fetch", &fetch)
            .finish()
    }
}
