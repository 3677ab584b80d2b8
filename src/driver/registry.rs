use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::PdoError;

use super::Driver;

static GLOBAL_REGISTRY: LazyLock<DriverRegistry> = LazyLock::new(DriverRegistry::with_defaults);

/// Drivers addressable by name.
///
/// Handles built with [`crate::pdo::Pdo::new`] resolve their driver through [`DriverRegistry::global`],
/// which is seeded with the built-in backends enabled at compile time.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

impl DriverRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in drivers (`sqlite`, `sqlite3` with the `sqlite` feature).
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        #[cfg(feature = "sqlite")]
        {
            let sqlite: Arc<dyn Driver> = Arc::new(crate::sqlite::SqliteDriver::default());
            registry.register_as("sqlite", Arc::clone(&sqlite));
            registry.register_as("sqlite3", sqlite);
        }
        registry
    }

    /// Process-wide registry.
    #[must_use]
    pub fn global() -> &'static DriverRegistry {
        &GLOBAL_REGISTRY
    }

    /// Register `driver` under its own [`Driver::name`], replacing any previous entry.
    pub fn register(&self, driver: Arc<dyn Driver>) {
        let name = driver.name().to_owned();
        self.register_as(name, driver);
    }

    /// Register `driver` under an explicit alias, replacing any previous entry.
    pub fn register_as(&self, name: impl Into<String>, driver: Arc<dyn Driver>) {
        self.write().insert(name.into(), driver);
    }

    /// Look up a driver by name.
    ///
    /// # Errors
    /// Returns `PdoError::UnknownDriver` if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Driver>, PdoError> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| PdoError::UnknownDriver(name.to_owned()))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Driver>>> {
        match self.drivers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Driver>>> {
        match self.drivers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}
