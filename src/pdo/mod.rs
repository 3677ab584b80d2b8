//! The PDO handle: a connection target plus at most one open transaction.
//!
//! Outside a transaction every call opens its own connection and closes it before returning.
//! Between [`Pdo::begin_transaction`] and [`Pdo::commit`]/[`Pdo::roll_back`] the transaction's
//! connection is reused by [`Pdo::query`] and [`Pdo::exec`]. Clones of a handle (and the
//! statements prepared from it) share that transaction state.

mod options;

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::driver::{Connection, Driver, DriverRegistry};
use crate::error::PdoError;
use crate::query_builder;
use crate::results::{Rows, collect_rows};
use crate::statement::PdoStatement;

pub use options::{PdoOptions, PdoOptionsBuilder};

/// Handle to a configured database.
#[derive(Clone)]
pub struct Pdo {
    inner: Arc<PdoInner>,
}

struct PdoInner {
    driver_name: String,
    dsn: String,
    driver: Arc<dyn Driver>,
    tx: Mutex<TxState>,
}

enum TxState {
    Idle,
    Active(Box<dyn Connection>),
}

impl Pdo {
    /// Create a handle for a driver registered in the global [`DriverRegistry`].
    ///
    /// No connection is opened until the first operation.
    ///
    /// # Errors
    /// Returns `PdoError::UnknownDriver` if `driver_name` is not registered.
    pub fn new(driver_name: &str, dsn: impl Into<String>) -> Result<Self, PdoError> {
        Self::from_options(PdoOptions::new(driver_name, dsn))
    }

    /// Create a handle around an explicit driver, bypassing the registry.
    #[must_use]
    pub fn with_driver(driver: Arc<dyn Driver>, dsn: impl Into<String>) -> Self {
        let driver_name = driver.name().to_owned();
        Self::assemble(driver_name, dsn.into(), driver)
    }

    /// # Errors
    /// Returns `PdoError` if the options are invalid or the driver is not registered.
    pub fn from_options(opts: PdoOptions) -> Result<Self, PdoError> {
        opts.validate()?;
        let driver = match &opts.registry {
            Some(registry) => registry.get(&opts.driver)?,
            None => DriverRegistry::global().get(&opts.driver)?,
        };
        Ok(Self::assemble(opts.driver, opts.dsn, driver))
    }

    fn assemble(driver_name: String, dsn: String, driver: Arc<dyn Driver>) -> Self {
        Self {
            inner: Arc::new(PdoInner {
                driver_name,
                dsn,
                driver,
                tx: Mutex::new(TxState::Idle),
            }),
        }
    }

    #[must_use]
    pub fn driver_name(&self) -> &str {
        &self.inner.driver_name
    }

    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.inner.dsn
    }

    /// Quote `value` the way bound arguments are substituted into statements.
    #[must_use]
    pub fn quote(&self, value: &str) -> String {
        query_builder::quote(value)
    }

    pub(crate) async fn open_connection(&self) -> Result<Box<dyn Connection>, PdoError> {
        self.inner.driver.open(&self.inner.dsn).await
    }

    /// Prepare a statement for execution.
    ///
    /// # Errors
    /// Returns `PdoError::TransactionActive` while a transaction is open.
    pub async fn prepare(&self, statement: &str) -> Result<PdoStatement, PdoError> {
        if self.in_transaction().await {
            return Err(PdoError::TransactionActive("prepare"));
        }
        Ok(PdoStatement::new(statement, self.clone()))
    }

    /// Run a row-returning statement and materialize every row.
    ///
    /// # Errors
    /// Returns `PdoError` if opening the connection, running the statement or reading rows fails.
    pub async fn query(&self, statement: &str) -> Result<Rows, PdoError> {
        let mut tx = self.inner.tx.lock().await;
        if let TxState::Active(conn) = &mut *tx {
            return run_query(conn.as_mut(), statement).await;
        }
        drop(tx);

        let mut conn = self.open_connection().await?;
        let result = run_query(conn.as_mut(), statement).await;
        release(conn, result).await
    }

    /// Run a mutating statement and return the number of affected rows.
    ///
    /// # Errors
    /// Returns `PdoError` if opening the connection or running the statement fails.
    pub async fn exec(&self, statement: &str) -> Result<u64, PdoError> {
        let mut tx = self.inner.tx.lock().await;
        if let TxState::Active(conn) = &mut *tx {
            return conn.exec(statement).await;
        }
        drop(tx);

        let mut conn = self.open_connection().await?;
        let result = conn.exec(statement).await;
        release(conn, result).await
    }

    /// Start a transaction. Does nothing if one is already open.
    ///
    /// # Errors
    /// Returns `PdoError` if the connection cannot be opened or the backend refuses `BEGIN`.
    pub async fn begin_transaction(&self) -> Result<(), PdoError> {
        let mut tx = self.inner.tx.lock().await;
        if matches!(*tx, TxState::Active(_)) {
            return Ok(());
        }

        let mut conn = self.open_connection().await?;
        if let Err(err) = conn.begin().await {
            return release(conn, Err(err)).await;
        }
        *tx = TxState::Active(conn);
        Ok(())
    }

    /// Commit the open transaction.
    ///
    /// When the backend rejects the commit a rollback is attempted; the error carries both
    /// outcomes. Either way the handle leaves the transaction.
    ///
    /// # Errors
    /// Returns `PdoError::NotInTransaction` without an open transaction, or
    /// `PdoError::CommitFailed` if the backend rejects the commit.
    pub async fn commit(&self) -> Result<(), PdoError> {
        let mut tx = self.inner.tx.lock().await;
        let TxState::Active(mut conn) = std::mem::replace(&mut *tx, TxState::Idle) else {
            return Err(PdoError::NotInTransaction("commit"));
        };

        match conn.commit().await {
            Ok(()) => release(conn, Ok(())).await,
            Err(err) => {
                tracing::error!(error = %err, dsn = %self.inner.dsn, "commit failed, rolling back");
                let rollback = conn.rollback().await.err().map(Box::new);
                release(
                    conn,
                    Err(PdoError::CommitFailed {
                        source: Box::new(err),
                        rollback,
                    }),
                )
                .await
            }
        }
    }

    /// Roll back the open transaction.
    ///
    /// # Errors
    /// Returns `PdoError::NotInTransaction` without an open transaction, or the backend's error
    /// if the rollback fails. The handle leaves the transaction in both cases.
    pub async fn roll_back(&self) -> Result<(), PdoError> {
        let mut tx = self.inner.tx.lock().await;
        let TxState::Active(mut conn) = std::mem::replace(&mut *tx, TxState::Idle) else {
            return Err(PdoError::NotInTransaction("roll back"));
        };

        let result = conn.rollback().await;
        release(conn, result).await
    }

    /// Whether a transaction is currently open on this handle.
    pub async fn in_transaction(&self) -> bool {
        matches!(*self.inner.tx.lock().await, TxState::Active(_))
    }
}

impl fmt::Debug for Pdo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tx = match self.inner.tx.try_lock() {
            Ok(guard) => match *guard {
                TxState::Idle => "idle",
                TxState::Active(_) => "active",
            },
            Err(_) => "busy",
        };
        f.debug_struct("Pdo")
            .field("driver_name", &self.inner.driver_name)
            .field("dsn", &self.inner.dsn)
            .field("transaction", &tx)
            .finish()
    }
}

pub(crate) async fn run_query(conn: &mut dyn Connection, statement: &str) -> Result<Rows, PdoError> {
    let mut cursor = conn.query(statement).await?;
    let rows = collect_rows(cursor.as_mut()).await;
    let closed = cursor.close().await;
    let rows = rows?;
    closed?;
    Ok(rows)
}

/// Close a per-call connection, keeping the operation's error if both fail.
pub(crate) async fn release<T>(
    mut conn: Box<dyn Connection>,
    result: Result<T, PdoError>,
) -> Result<T, PdoError> {
    let closed = conn.close().await;
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            tracing::warn!(error = %close_err, "failed to close connection after error");
            Err(err)
        }
    }
}
