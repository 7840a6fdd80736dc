//! Single-file driver for persistent storage.

use crate::driver::{Cursor, Driver, QueryParams};
use crate::error::{DriverError, DriverResult};
use crate::store::{Store, TxStore};
use fs2::FileExt;
use parking_lot::RwLock;
use persist_value::{Decode, Encode, Value};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options understood by [`FileDriver`], read from the driver config value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileConfig {
    /// Create the store file if it does not exist.
    pub create_if_missing: bool,
    /// `fsync` the store after every write.
    pub sync: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync: true,
        }
    }
}

impl FileConfig {
    /// Reads options from a config value.
    ///
    /// `Null` yields the defaults; otherwise the value must be a dictionary
    /// whose recognized keys hold booleans. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a dictionary or a recognized
    /// key has the wrong type.
    pub fn from_value(value: &Value) -> DriverResult<Self> {
        let mut config = Self::default();
        let entries = match value {
            Value::Null => return Ok(config),
            Value::Dict(entries) => entries,
            other => {
                return Err(DriverError::other(format!(
                    "file driver config must be a dictionary, found {}",
                    other.type_name()
                )))
            }
        };

        let flag = |key: &str, default: bool| -> DriverResult<bool> {
            match entries.get(key) {
                None => Ok(default),
                Some(Value::Bool(b)) => Ok(*b),
                Some(other) => Err(DriverError::other(format!(
                    "file driver option '{key}' must be a bool, found {}",
                    other.type_name()
                ))),
            }
        };
        config.create_if_missing = flag("create_if_missing", config.create_if_missing)?;
        config.sync = flag("sync", config.sync)?;
        Ok(config)
    }
}

/// A driver keeping the whole database in one CBOR file, registered as
/// `file`.
///
/// The file is loaded at open and rewritten after every mutation made
/// outside a transaction, and once at commit. Writes go to a temporary
/// sibling which is then renamed over the store, so a crash leaves either
/// the old or the new contents.
///
/// An exclusive advisory lock on `<path>.lock` is held while the driver is
/// open; a second open of the same path fails with
/// [`DriverError::Locked`].
///
/// # Example
///
/// ```no_run
/// use persist_driver::{Driver, FileDriver};
/// use persist_value::{dict, Value};
///
/// let driver = FileDriver::new();
/// driver.open("data/app.db", &Value::Null).unwrap();
/// driver.create_collection("users").unwrap();
/// driver.save_object("users", "1", &dict! { "name" => "Ann" }).unwrap();
/// driver.close().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct FileDriver {
    state: RwLock<Option<FileState>>,
}

#[derive(Debug)]
struct FileState {
    path: PathBuf,
    config: FileConfig,
    store: TxStore,
    lock: File,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

impl FileState {
    fn write_file(&self, store: &Store) -> DriverResult<()> {
        let bytes = store.to_value().encode()?;
        let temp = sibling(&self.path, ".tmp");
        {
            let mut file = File::create(&temp)?;
            file.write_all(&bytes)?;
            if self.config.sync {
                file.sync_all()?;
            }
        }
        fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "wrote store");
        Ok(())
    }
}

impl FileDriver {
    /// Name the driver is registered under.
    pub const NAME: &'static str = "file";

    /// Creates a new, unopened file driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn load(path: &Path) -> DriverResult<Store> {
        if path.exists() {
            let bytes = fs::read(path)?;
            return Store::from_value(&Value::decode(&bytes)?);
        }
        Ok(Store::default())
    }

    fn read<R>(&self, f: impl FnOnce(&TxStore) -> DriverResult<R>) -> DriverResult<R> {
        let state = self.state.read();
        state.as_ref().map_or(Err(DriverError::Closed), |s| f(&s.store))
    }

    /// Applies a mutation. Outside a transaction the mutated copy is
    /// written to disk before it replaces the in-memory store, so a failed
    /// write leaves both unchanged.
    fn mutate<R>(&self, f: impl FnOnce(&mut Store) -> DriverResult<R>) -> DriverResult<R> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(DriverError::Closed)?;

        if state.store.in_tx() {
            return f(&mut state.store.current);
        }

        let mut next = state.store.current.clone();
        let result = f(&mut next)?;
        state.write_file(&next)?;
        state.store.current = next;
        Ok(result)
    }
}

impl Driver for FileDriver {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn open(&self, path: &str, config: &Value) -> DriverResult<()> {
        let mut state = self.state.write();
        if state.is_some() {
            return Err(DriverError::other("driver is already open"));
        }
        if path.is_empty() {
            return Err(DriverError::other("file driver needs a path"));
        }

        let config = FileConfig::from_value(config)?;
        let path = PathBuf::from(path);
        if config.create_if_missing {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        } else if !path.exists() {
            return Err(DriverError::other(format!(
                "store does not exist: {}",
                path.display()
            )));
        }

        // Lock before loading so no other holder can write after the read
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(sibling(&path, ".lock"))?;
        if lock.try_lock_exclusive().is_err() {
            return Err(DriverError::Locked {
                path: path.display().to_string(),
            });
        }
        let store = Self::load(&path)?;

        debug!(path = %path.display(), ?config, "opened file store");
        *state = Some(FileState {
            path,
            config,
            store: TxStore::new(store),
            lock,
        });
        Ok(())
    }

    fn close(&self) -> DriverResult<()> {
        let mut guard = self.state.write();
        let mut state = guard.take().ok_or(DriverError::Closed)?;

        if state.store.in_tx() {
            warn!(path = %state.path.display(), "closing with an active transaction, rolling back");
            state.store.rollback()?;
        }
        state.lock.unlock()?;
        debug!(path = %state.path.display(), "closed file store");
        Ok(())
    }

    fn create_collection(&self, name: &str) -> DriverResult<()> {
        self.mutate(|s| {
            s.create_collection(name);
            Ok(())
        })
    }

    fn destroy_collection(&self, name: &str) -> DriverResult<()> {
        self.mutate(|s| s.destroy_collection(name))
    }

    fn save_object(&self, collection: &str, id: &str, value: &Value) -> DriverResult<()> {
        self.mutate(|s| s.save_object(collection, id, value))
    }

    fn save_objects(&self, collection: &str, documents: &[Value]) -> DriverResult<()> {
        self.mutate(|s| s.save_objects(collection, documents))
    }

    fn get_object(&self, collection: &str, id: &str) -> DriverResult<Value> {
        self.read(|s| s.current.get_object(collection, id))
    }

    fn delete_object(&self, collection: &str, id: &str) -> DriverResult<()> {
        self.mutate(|s| s.delete_object(collection, id))
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
        self.mutate(|s| s.add_index(collection, index, path))
    }

    fn drop_index(&self, collection: &str, index: &str) -> DriverResult<()> {
        self.mutate(|s| s.drop_index(collection, index))
    }

    fn start_tx(&self) -> DriverResult<()> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(DriverError::Closed)?;
        state.store.start()
    }

    fn commit_tx(&self) -> DriverResult<()> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(DriverError::Closed)?;
        if !state.store.in_tx() {
            return Err(DriverError::transaction("no active transaction to commit"));
        }
        // A failed write leaves the transaction open so it can be rolled back
        state.write_file(&state.store.current)?;
        state.store.commit()
    }

    fn rollback_tx(&self) -> DriverResult<()> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(DriverError::Closed)?;
        state.store.rollback()
    }

    fn in_tx(&self) -> bool {
        self.state
            .read()
            .as_ref()
            .is_some_and(|s| s.store.in_tx())
    }
}
