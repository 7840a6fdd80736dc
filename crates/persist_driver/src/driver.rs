//! Driver contract definition.

use crate::error::DriverResult;
use persist_value::Value;

/// A pluggable storage backend.
///
/// Drivers own everything about how documents are stored, indexed, and
/// queried. The facade only hands them collection names, ids, values,
/// and opaque query rules.
///
/// # Invariants
///
/// - `get_object` reports a miss as [`DriverError::NotFound`], never as
///   a generic failure
/// - `save_object` and `save_objects` are atomic per call
/// - [`Cursor::next`] returns `Ok(None)` at natural exhaustion, and keeps
///   returning it on further calls
/// - Stored values need not carry their own `id`; the id is the key
/// - The driver is the only authority on transaction state
///
/// All methods take `&self`: a driver synchronizes its own state and is
/// exactly as thread-safe as its implementation makes it.
///
/// # Implementors
///
/// - [`super::MemoryDriver`] - In-memory store (`mem`)
/// - [`super::FileDriver`] - Single CBOR file (`file`)
///
/// [`DriverError::NotFound`]: crate::DriverError::NotFound
pub trait Driver: Send + Sync {
    /// Returns the name this driver is registered under.
    fn name(&self) -> &str;

    /// Binds the driver to a path and configuration and allocates state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be initialized.
    fn open(&self, path: &str, config: &Value) -> DriverResult<()>;

    /// Releases all driver resources.
    ///
    /// # Errors
    ///
    /// Returns an error if pending state cannot be released cleanly.
    fn close(&self) -> DriverResult<()>;

    /// Creates a collection namespace. Creating an existing one is a no-op.
    fn create_collection(&self, name: &str) -> DriverResult<()>;

    /// Destroys a collection namespace and every object in it.
    fn destroy_collection(&self, name: &str) -> DriverResult<()>;

    /// Stores `value` under `id`, replacing any previous value.
    fn save_object(&self, collection: &str, id: &str, value: &Value) -> DriverResult<()>;

    /// Stores a batch of documents, each keyed by its own `id` field.
    ///
    /// Either every document is stored or none is.
    fn save_objects(&self, collection: &str, documents: &[Value]) -> DriverResult<()>;

    /// Fetches the value stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotFound`](crate::DriverError::NotFound) if
    /// there is no such object.
    fn get_object(&self, collection: &str, id: &str) -> DriverResult<Value>;

    /// Deletes the object stored under `id`.
    fn delete_object(&self, collection: &str, id: &str) -> DriverResult<()>;

    /// Starts a query and returns a cursor over the matching objects.
    ///
    /// `rules` and `params` are interpreted by the driver alone.
    fn query(
        &self,
        collection: &str,
        rules: &Value,
        params: &QueryParams,
    ) -> DriverResult<Box<dyn Cursor>>;

    /// Counts the objects matching `filter` (`Null` matches everything).
    fn count(&self, collection: &str, filter: &Value) -> DriverResult<usize>;

    /// Adds a named secondary index over a document path.
    fn add_index(&self, collection: &str, index: &str, path: &str) -> DriverResult<()>;

    /// Drops a named secondary index.
    fn drop_index(&self, collection: &str, index: &str) -> DriverResult<()>;

    /// Starts a transaction.
    fn start_tx(&self) -> DriverResult<()>;

    /// Commits the active transaction.
    fn commit_tx(&self) -> DriverResult<()>;

    /// Rolls back the active transaction.
    fn rollback_tx(&self) -> DriverResult<()>;

    /// Returns true if a transaction is active.
    fn in_tx(&self) -> bool;
}

/// A driver-side query cursor.
pub trait Cursor: Send {
    /// Returns the next `(id, value)` pair, or `None` when exhausted.
    fn next(&mut self) -> DriverResult<Option<(String, Value)>>;

    /// Releases cursor resources. Called exactly once.
    fn close(&mut self) -> DriverResult<()>;
}

/// Query parameters.
///
/// These are transported to the driver untouched. The bundled drivers
/// honour all of them; other drivers may ignore what they don't support.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Document path to sort by.
    pub sort: Option<String>,
    /// Sort in descending order.
    pub descending: bool,
    /// Number of matching documents to skip.
    pub offset: usize,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl QueryParams {
    /// Creates empty query parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sort path.
    #[must_use]
    pub fn sort(mut self, path: impl Into<String>) -> Self {
        self.sort = Some(path.into());
        self
    }

    /// Sets descending order.
    #[must_use]
    pub const fn descending(mut self, value: bool) -> Self {
        self.descending = value;
        self
    }

    /// Sets the offset.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the limit.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_builder() {
        let params = QueryParams::new()
            .sort("age")
            .descending(true)
            .offset(5)
            .limit(10);

        assert_eq!(params.sort.as_deref(), Some("age"));
        assert!(params.descending);
        assert_eq!(params.offset, 5);
        assert_eq!(params.limit, Some(10));
    }

    #[test]
    fn default_params_are_empty() {
        let params = QueryParams::default();
        assert!(params.sort.is_none());
        assert!(!params.descending);
        assert_eq!(params.offset, 0);
        assert!(params.limit.is_none());
    }
}
