//! In-memory driver.

use crate::driver::{Cursor, Driver, QueryParams};
use crate::error::{DriverError, DriverResult};
use crate::store::{Store, TxStore};
use parking_lot::RwLock;
use persist_value::Value;
use tracing::debug;

/// An in-memory driver, registered as `mem`.
///
/// All data lives in process memory and is discarded on close. Suitable
/// for:
/// - Unit and integration tests
/// - Ephemeral databases that don't need persistence
///
/// The path and configuration passed to `open` are ignored.
///
/// # Thread Safety
///
/// The driver is thread-safe; every operation takes an internal lock.
///
/// # Example
///
/// ```rust
/// use persist_driver::{Driver, MemoryDriver};
/// use persist_value::{dict, Value};
///
/// let driver = MemoryDriver::new();
/// driver.open("", &Value::Null).unwrap();
/// driver.create_collection("users").unwrap();
/// driver.save_object("users", "1", &dict! { "name" => "Ann" }).unwrap();
/// assert_eq!(driver.count("users", &Value::Null).unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryDriver {
    state: RwLock<Option<TxStore>>,
}

impl MemoryDriver {
    /// Name the driver is registered under.
    pub const NAME: &'static str = "mem";

    /// Creates a new, unopened in-memory driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read<R>(&self, f: impl FnOnce(&TxStore) -> DriverResult<R>) -> DriverResult<R> {
        let state = self.state.read();
        state.as_ref().map_or(Err(DriverError::Closed), f)
    }

    fn write<R>(&self, f: impl FnOnce(&mut TxStore) -> DriverResult<R>) -> DriverResult<R> {
        let mut state = self.state.write();
        state.as_mut().map_or(Err(DriverError::Closed), f)
    }
}

impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn open(&self, _path: &str, _config: &Value) -> DriverResult<()> {
        let mut state = self.state.write();
        if state.is_some() {
            return Err(DriverError::other("driver is already open"));
        }
        *state = Some(TxStore::new(Store::default()));
        debug!("opened in-memory store");
        Ok(())
    }

    fn close(&self) -> DriverResult<()> {
        let mut state = self.state.write();
        if state.take().is_none() {
            return Err(DriverError::Closed);
        }
        debug!("closed in-memory store");
        Ok(())
    }

    fn create_collection(&self, name: &str) -> DriverResult<()> {
        self.write(|s| {
            s.current.create_collection(name);
            Ok(())
        })
    }

    fn destroy_collection(&self, name: &str) -> DriverResult<()> {
        self.write(|s| s.current.destroy_collection(name))
    }

    fn save_object(&self, collection: &str, id: &str, value: &Value) -> DriverResult<()> {
        self.write(|s| s.current.save_object(collection, id, value))
    }

    fn save_objects(&self, collection: &str, documents: &[Value]) -> DriverResult<()> {
        self.write(|s| s.current.save_objects(collection, documents))
    }

    fn get_object(&self, collection: &str, id: &str) -> DriverResult<Value> {
        self.read(|s| s.current.get_object(collection, id))
    }

    fn delete_object(&self, collection: &str, id: &str) -> DriverResult<()> {
        self.write(|s| s.current.delete_object(collection, id))
    }

    fn query(
        &self,
        collection: &str,
        rules: &Value,
        params: &QueryParams,
    ) -> DriverResult<Box<dyn Cursor>> {
        self.read(|s| {
            s.current
                .query(collection, rules, params)
                .map(|cursor| Box::new(cursor) as Box<dyn Cursor>)
        })
    }

    fn count(&self, collection: &str, filter: &Value) -> DriverResult<usize> {
        self.read(|s| s.current.count(collection, filter))
    }

    fn add_index(&self, collection: &str, index: &str, path: &str) -> DriverResult<()> {
        self.write(|s| s.current.add_index(collection, index, path))
    }

    fn drop_index(&self, collection: &str, index: &str) -> DriverResult<()> {
        self.write(|s| s.current.drop_index(collection, index))
    }

    fn start_tx(&self) -> DriverResult<()> {
        self.write(TxStore::start)
    }

    fn commit_tx(&self) -> DriverResult<()> {
        self.write(TxStore::commit)
    }

    fn rollback_tx(&self) -> DriverResult<()> {
        self.write(TxStore::rollback)
    }

    fn in_tx(&self) -> bool {
        self.state.read().as_ref().is_some_and(TxStore::in_tx)
    }
}
