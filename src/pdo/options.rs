use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::driver::DriverRegistry;
use crate::error::PdoError;

use super::Pdo;

/// Connection target of a [`Pdo`] handle.
///
/// Deserializable so it can live in an application config file:
/// ```rust
/// # use sql_pdo::pdo::PdoOptions;
/// let opts: PdoOptions =
///     serde_json::from_str(r#"{"driver": "sqlite", "dsn": "app.db"}"#).unwrap();
/// assert_eq!(opts.driver, "sqlite");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdoOptions {
    /// Registered driver name, e.g. `sqlite`.
    pub driver: String,
    /// Data source handed to the driver on every open.
    pub dsn: String,
    /// Registry to resolve `driver` in; the global registry when unset.
    #[serde(skip)]
    pub registry: Option<Arc<DriverRegistry>>,
}

impl PdoOptions {
    #[must_use]
    pub fn new(driver: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            dsn: dsn.into(),
            registry: None,
        }
    }

    #[must_use]
    pub fn builder(driver: impl Into<String>, dsn: impl Into<String>) -> PdoOptionsBuilder {
        PdoOptionsBuilder::new(driver, dsn)
    }

    /// # Errors
    /// Returns `PdoError::ConfigError` when the driver name is blank.
    pub fn validate(&self) -> Result<(), PdoError> {
        if self.driver.trim().is_empty() {
            return Err(PdoError::ConfigError("driver name must not be empty".into()));
        }
        Ok(())
    }
}

/// Fluent builder for [`PdoOptions`].
#[derive(Debug, Clone)]
pub struct PdoOptionsBuilder {
    opts: PdoOptions,
}

impl PdoOptionsBuilder {
    #[must_use]
    pub fn new(driver: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self {
            opts: PdoOptions::new(driver, dsn),
        }
    }

    /// Resolve the driver in `registry` instead of the global one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<DriverRegistry>) -> Self {
        self.opts.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn finish(self) -> PdoOptions {
        self.opts
    }

    /// Build a [`Pdo`] handle.
    ///
    /// # Errors
    /// Returns `PdoError` if the options are invalid or the driver is not registered.
    pub fn build(self) -> Result<Pdo, PdoError> {
        Pdo::from_options(self.finish())
    }
}
