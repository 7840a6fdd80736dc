//! Transaction scope.
//!
//! A transaction is a mode of the database handle, not a separate object.
//! The driver is the only authority on whether one is active; the facade
//! keeps no transaction state of its own.

use crate::database::Database;
use crate::error::{PersistError, PersistResult};
use crate::last_error::fail;
use tracing::{debug, warn};

impl Database {
    /// Starts a transaction.
    ///
    /// Fails with `TransactionError` if the driver refuses, for example
    /// because one is already active.
    pub fn start_transaction(&self) -> PersistResult<()> {
        debug!(path = %self.path(), "start transaction");
        self.driver()
            .start_tx()
            .map_err(|e| fail(PersistError::transaction(e)))
    }

    /// Commits the active transaction.
    pub fn commit_transaction(&self) -> PersistResult<()> {
        debug!(path = %self.path(), "commit transaction");
        self.driver()
            .commit_tx()
            .map_err(|e| fail(PersistError::transaction(e)))
    }

    /// Rolls back the active transaction.
    pub fn rollback_transaction(&self) -> PersistResult<()> {
        debug!(path = %self.path(), "rollback transaction");
        self.driver()
            .rollback_tx()
            .map_err(|e| fail(PersistError::transaction(e)))
    }

    /// Returns true if the driver reports an active transaction.
    #[must_use]
    pub fn is_transaction_active(&self) -> bool {
        self.driver().in_tx()
    }

    /// Runs `f` inside a transaction.
    ///
    /// Commits if `f` succeeds. If `f` fails the transaction is rolled back
    /// and `f`'s error is returned unchanged.
    ///
    /// ```rust
    /// use persist_core::{dict, Database, Value};
    ///
    /// let db = Database::open("scratch", "mem", &Value::Null)?;
    /// db.collection("users", true)?;
    ///
    /// db.transaction(|db| {
    ///     let users = db.collection("users", false)?;
    ///     users.save(&dict! { "id" => "1" })?;
    ///     users.save(&dict! { "id" => "2" })
    /// })?;
    ///
    /// assert_eq!(db.collection("users", false)?.count(&Value::Null)?, 2);
    /// # Ok::<(), persist_core::PersistError>(())
    /// ```
    pub fn transaction<T, F>(&self, f: F) -> PersistResult<T>
    where
        F: FnOnce(&Self) -> PersistResult<T>,
    {
        self.start_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit_transaction()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.rollback_transaction() {
                    warn!(error = %rollback, "rollback after failed transaction body");
                }
                Err(err)
            }
        }
    }
}
