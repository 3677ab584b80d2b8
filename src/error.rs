use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdoError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("No driver registered under name: {0}")]
    UnknownDriver(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Column introspection error: {0}")]
    ColumnError(String),

    /// `prepare` was called while the handle holds an open transaction.
    #[error("Transaction in progress; operation not permitted ({0})")]
    TransactionActive(&'static str),

    /// `commit` or `roll_back` was called without an open transaction.
    #[error("Not in a transaction ({0})")]
    NotInTransaction(&'static str),

    /// Column count was requested for a statement whose result has no rows.
    #[error("Result set is empty; no row to count columns from")]
    EmptyResultSet,

    /// Commit failed; `rollback` carries the outcome of the follow-up rollback attempt.
    #[error("Commit failed: {source}")]
    CommitFailed {
        #[source]
        source: Box<PdoError>,
        rollback: Option<Box<PdoError>>,
    },

    #[error("Other database error: {0}")]
    Other(String),
}

impl PdoError {
    /// True for failures caused by calling an operation in the wrong transaction state.
    #[must_use]
    pub fn is_transaction_state(&self) -> bool {
        matches!(
            self,
            PdoError::TransactionActive(_) | PdoError::NotInTransaction(_)
        )
    }
}
