//! Collections and collection management.

use crate::database::{Database, RESERVED_COLLECTION};
use crate::document::{document_id, Document};
use crate::error::{PersistError, PersistResult};
use crate::last_error::fail;
use crate::query::QueryIter;
use crate::record::CollectionRecord;
use persist_driver::{DriverError, QueryParams};
use persist_value::Value;
use tracing::{debug, info, warn};

/// Handle to a named collection of documents.
///
/// Holds no documents itself: every operation delegates to the driver
/// bound to the owning [`Database`]. Any number of handles may name the
/// same collection.
#[derive(Debug, Clone)]
pub struct Collection<'db> {
    db: &'db Database,
    name: String,
}

fn check_name(name: &str) -> PersistResult<()> {
    if name.is_empty() {
        return Err(PersistError::invalid_argument("collection name is empty"));
    }
    if name == RESERVED_COLLECTION {
        return Err(PersistError::invalid_argument(format!(
            "'{RESERVED_COLLECTION}' is reserved"
        )));
    }
    Ok(())
}

impl Database {
    /// Looks up a collection, creating it if `create_if_missing` is set.
    ///
    /// Creating writes a fresh metadata record into the reserved
    /// collection. If that write fails, a namespace created by this call
    /// is destroyed again; one that already existed is left as it was.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty name or the reserved name
    /// - `NotFound` if missing and `create_if_missing` is false
    /// - `CollectionInitError` if creation fails
    pub fn collection(&self, name: &str, create_if_missing: bool) -> PersistResult<Collection<'_>> {
        check_name(name).map_err(fail)?;

        match self.driver().get_object(RESERVED_COLLECTION, name) {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                if !create_if_missing {
                    return Err(fail(PersistError::collection_not_found(name)));
                }
                self.create_collection(name)?;
            }
            Err(err) => return Err(fail(err)),
        }

        Ok(Collection {
            db: self,
            name: name.to_string(),
        })
    }

    fn create_collection(&self, name: &str) -> PersistResult<()> {
        let init_error = |source: DriverError| {
            fail(PersistError::CollectionInit {
                name: name.to_string(),
                source,
            })
        };

        // A namespace left without a record keeps its documents
        let preexisting = match self.driver().count(name, &Value::Null) {
            Ok(_) => true,
            Err(DriverError::CollectionNotFound { .. }) => false,
            Err(err) => return Err(init_error(err)),
        };

        let record = CollectionRecord::new();
        self.driver().create_collection(name).map_err(&init_error)?;

        if let Err(source) = self
            .driver()
            .save_object(RESERVED_COLLECTION, name, &record.to_value())
        {
            if preexisting {
                warn!(collection = name, error = %source, "metadata write failed");
            } else {
                warn!(collection = name, error = %source, "metadata write failed, destroying namespace");
                if let Err(err) = self.driver().destroy_collection(name) {
                    warn!(collection = name, error = %err, "failed to destroy namespace");
                }
            }
            return Err(init_error(source));
        }

        info!(collection = name, "created collection");
        Ok(())
    }

    /// Returns true if the collection has a metadata record.
    #[must_use]
    pub fn collection_exists(&self, name: &str) -> bool {
        self.driver().get_object(RESERVED_COLLECTION, name).is_ok()
    }

    /// Removes a collection: destroys its namespace, then its metadata
    /// record.
    ///
    /// A record whose namespace is already gone is still deleted, so a
    /// removal interrupted between the two steps can be retried.
    pub fn remove_collection(&self, name: &str) -> PersistResult<()> {
        check_name(name).map_err(fail)?;

        if let Err(err) = self.driver().destroy_collection(name) {
            if !err.is_not_found() || !self.collection_exists(name) {
                return Err(fail(err));
            }
            warn!(collection = name, "namespace already gone, deleting record");
        }
        if let Err(err) = self.driver().delete_object(RESERVED_COLLECTION, name) {
            if !err.is_not_found() {
                return Err(fail(err));
            }
        }

        info!(collection = name, "removed collection");
        Ok(())
    }

    fn raw_record(&self, name: &str) -> PersistResult<Value> {
        self.driver()
            .get_object(RESERVED_COLLECTION, name)
            .map_err(|err| {
                if err.is_not_found() {
                    fail(PersistError::collection_not_found(name))
                } else {
                    fail(err)
                }
            })
    }

    /// Returns the full metadata record of a collection.
    pub fn collection_record(&self, name: &str) -> PersistResult<CollectionRecord> {
        let raw = self.raw_record(name)?;
        CollectionRecord::from_value(&raw).map_err(fail)
    }

    /// Returns the application metadata of a collection.
    pub fn collection_metadata(&self, name: &str) -> PersistResult<Value> {
        let raw = self.raw_record(name)?;
        match raw.get(CollectionRecord::METADATA) {
            None | Some(Value::Null) => Ok(Value::empty_dict()),
            Some(metadata @ Value::Dict(_)) => Ok(metadata.clone()),
            Some(other) => Err(fail(PersistError::invalid_type(format!(
                "metadata must be a dict, got {}",
                other.type_name()
            )))),
        }
    }

    /// Replaces the application metadata of a collection.
    ///
    /// Other fields of the record are left as stored.
    pub fn set_collection_metadata(&self, name: &str, metadata: &Value) -> PersistResult<()> {
        if !metadata.is_dict() {
            return Err(fail(PersistError::invalid_argument(format!(
                "metadata must be a dict, got {}",
                metadata.type_name()
            ))));
        }

        let mut raw = self.raw_record(name)?;
        if !raw.set(CollectionRecord::METADATA, metadata.clone()) {
            return Err(fail(PersistError::invalid_type(format!(
                "collection record must be a dict, got {}",
                raw.type_name()
            ))));
        }

        debug!(collection = name, "set metadata");
        self.driver()
            .save_object(RESERVED_COLLECTION, name, &raw)
            .map_err(fail)
    }

    /// Calls `visitor` with each collection name, in driver order.
    ///
    /// Stops quietly at the end of the listing or at the first failure.
    /// Use [`Database::collection_names`] to see failures.
    pub fn for_each_collection_name<F>(&self, mut visitor: F)
    where
        F: FnMut(&str),
    {
        let mut cursor = match self
            .driver()
            .query(RESERVED_COLLECTION, &Value::Null, &QueryParams::default())
        {
            Ok(cursor) => cursor,
            Err(err) => {
                debug!(error = %err, "collection listing failed");
                return;
            }
        };

        while let Ok(Some((id, _))) = cursor.next() {
            visitor(&id);
        }

        if let Err(err) = cursor.close() {
            warn!(error = %err, "failed to close collection listing");
        }
    }

    /// Returns every collection name, in driver order.
    pub fn collection_names(&self) -> PersistResult<Vec<String>> {
        let mut cursor = self
            .driver()
            .query(RESERVED_COLLECTION, &Value::Null, &QueryParams::default())
            .map_err(fail)?;

        let mut names = Vec::new();
        let listed = loop {
            match cursor.next() {
                Ok(Some((id, _))) => names.push(id),
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        let closed = cursor.close();

        listed.and(closed).map_err(fail)?;
        Ok(names)
    }
}

impl<'db> Collection<'db> {
    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning database.
    #[must_use]
    pub fn database(&self) -> &'db Database {
        self.db
    }

    /// Creates a secondary index on `path`.
    pub fn add_index(&self, index: &str, path: &str) -> PersistResult<()> {
        debug!(collection = %self.name, index, path, "add index");
        self.db
            .driver()
            .add_index(&self.name, index, path)
            .map_err(fail)
    }

    /// Drops a secondary index.
    pub fn drop_index(&self, index: &str) -> PersistResult<()> {
        debug!(collection = %self.name, index, "drop index");
        self.db.driver().drop_index(&self.name, index).map_err(fail)
    }

    /// Saves a document under its `id`, replacing any previous version.
    ///
    /// Fails with `InvalidArgument`, without contacting the driver, unless
    /// `document` is a dict with a string `id`.
    pub fn save(&self, document: &Value) -> PersistResult<()> {
        let id = document_id(document).map_err(fail)?;
        debug!(collection = %self.name, id, "save");
        self.db
            .driver()
            .save_object(&self.name, id, document)
            .map_err(fail)
    }

    /// Saves an array of documents in one driver call.
    ///
    /// Whether the batch is atomic is up to the driver; both bundled
    /// drivers write all of it or none of it.
    pub fn save_many(&self, documents: &Value) -> PersistResult<()> {
        let Some(items) = documents.as_array() else {
            return Err(fail(PersistError::invalid_argument(format!(
                "documents must be an array, got {}",
                documents.type_name()
            ))));
        };
        debug!(collection = %self.name, count = items.len(), "save many");
        self.db
            .driver()
            .save_objects(&self.name, items)
            .map_err(fail)
    }

    /// Loads a document by id.
    pub fn get(&self, id: &str) -> PersistResult<Document> {
        let stored = self.db.driver().get_object(&self.name, id).map_err(fail)?;
        Document::from_stored(id, stored).map_err(fail)
    }

    /// Deletes a document by id.
    pub fn delete(&self, id: &str) -> PersistResult<()> {
        debug!(collection = %self.name, id, "delete");
        self.db.driver().delete_object(&self.name, id).map_err(fail)
    }

    /// Counts the documents matching `filter` (`Value::Null` counts all).
    pub fn count(&self, filter: &Value) -> PersistResult<usize> {
        self.db.driver().count(&self.name, filter).map_err(fail)
    }

    /// Starts a query.
    ///
    /// `rules` and `params` are handed to the driver as given; see
    /// [`persist_driver::rules`] for what the bundled drivers accept.
    pub fn query(&self, rules: &Value, params: &QueryParams) -> PersistResult<QueryIter<'db>> {
        debug!(collection = %self.name, ?params, "query");
        let cursor = self
            .db
            .driver()
            .query(&self.name, rules, params)
            .map_err(fail)?;
        Ok(QueryIter::new(&self.name, cursor))
    }

    /// Releases the handle. The collection itself is untouched.
    pub fn close(self) {}
}
