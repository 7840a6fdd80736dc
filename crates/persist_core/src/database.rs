//! Database handle.

use crate::config::Config;
use crate::error::{PersistError, PersistResult};
use crate::last_error::fail;
use persist_driver::{Driver, DriverRegistry};
use persist_value::Value;
use tracing::{info, warn};

/// Name of the reserved collection holding one metadata record per user
/// collection.
pub const RESERVED_COLLECTION: &str = "collections";

/// The main database handle.
///
/// A `Database` binds exactly one driver, opened on one path. Everything
/// else (collections, queries, transactions) goes through it.
///
/// # Opening a Database
///
/// ```rust
/// use persist_core::{dict, Database, QueryParams, Value};
///
/// let db = Database::open("scratch", "mem", &Value::Null)?;
///
/// let users = db.collection("users", true)?;
/// users.save(&dict! { "id" => "1", "name" => "Ann" })?;
///
/// assert_eq!(users.count(&Value::Null)?, 1);
/// assert_eq!(users.get("1")?.get("name"), Some(&Value::from("Ann")));
///
/// drop(users);
/// db.close()?;
/// # Ok::<(), persist_core::PersistError>(())
/// ```
///
/// # Lifecycle
///
/// [`Database::close`] consumes the handle and reports driver close
/// failures. Dropping an unclosed handle closes the driver and logs any
/// failure instead.
pub struct Database {
    path: String,
    driver_name: String,
    driver: Box<dyn Driver>,
    open: bool,
}

impl Database {
    /// Opens a database with one of the bundled drivers (`mem`, `file`).
    ///
    /// # Errors
    ///
    /// - `DriverNotFound` if no driver is registered under `driver`
    /// - `DriverInitError` if the driver fails to open
    /// - `CollectionInitError` if the reserved collection cannot be created
    pub fn open(path: &str, driver: &str, driver_config: &Value) -> PersistResult<Self> {
        let config = Config::new(driver).driver_config(driver_config.clone());
        Self::open_with_registry(path, &config, &DriverRegistry::default())
    }

    /// Opens a database described by `config` with the bundled drivers.
    pub fn open_with_config(path: &str, config: &Config) -> PersistResult<Self> {
        Self::open_with_registry(path, config, &DriverRegistry::default())
    }

    /// Opens a database, resolving the driver name against `registry`.
    ///
    /// Use this to bind drivers that are not bundled with Persist.
    pub fn open_with_registry(
        path: &str,
        config: &Config,
        registry: &DriverRegistry,
    ) -> PersistResult<Self> {
        let driver = registry.create(&config.driver).ok_or_else(|| {
            fail(PersistError::DriverNotFound {
                name: config.driver.clone(),
            })
        })?;

        driver
            .open(path, &config.driver_config)
            .map_err(|source| {
                fail(PersistError::DriverInit {
                    driver: config.driver.clone(),
                    source,
                })
            })?;

        if let Err(source) = driver.create_collection(RESERVED_COLLECTION) {
            if let Err(err) = driver.close() {
                warn!(path, driver = %config.driver, error = %err, "close after failed open");
            }
            return Err(fail(PersistError::CollectionInit {
                name: RESERVED_COLLECTION.to_string(),
                source,
            }));
        }

        info!(path, driver = %config.driver, "opened database");
        Ok(Self {
            path: path.to_string(),
            driver_name: config.driver.clone(),
            driver,
            open: true,
        })
    }

    /// Closes the database, releasing driver resources.
    pub fn close(mut self) -> PersistResult<()> {
        self.open = false;
        self.driver.close().map_err(fail)?;
        info!(path = %self.path, "closed database");
        Ok(())
    }

    /// Returns the path the database was opened on.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the name the driver was resolved by.
    #[must_use]
    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub(crate) fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("driver", &self.driver_name)
            .finish_non_exhaustive()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.driver.close() {
                warn!(path = %self.path, error = %err, "failed to close database on drop");
            }
        }
    }
}
