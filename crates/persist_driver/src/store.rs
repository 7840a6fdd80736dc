//! Collection store shared by the bundled drivers.

use crate::driver::{Cursor, QueryParams};
use crate::error::{DriverError, DriverResult};
use crate::rules::{self, Filter};
use persist_value::{Dict, Value};
use std::collections::BTreeMap;

const FORMAT_VERSION: i64 = 1;

/// One collection namespace: objects keyed by id, plus index definitions.
#[derive(Debug, Clone, Default, PartialEq)]
struct Namespace {
    objects: BTreeMap<String, Value>,
    /// Index name to document path.
    indexes: BTreeMap<String, String>,
}

/// All collections of one database.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Store {
    collections: BTreeMap<String, Namespace>,
}

impl Store {
    fn namespace(&self, name: &str) -> DriverResult<&Namespace> {
        self.collections
            .get(name)
            .ok_or_else(|| DriverError::collection_not_found(name))
    }

    fn namespace_mut(&mut self, name: &str) -> DriverResult<&mut Namespace> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| DriverError::collection_not_found(name))
    }

    pub(crate) fn create_collection(&mut self, name: &str) {
        self.collections.entry(name.to_string()).or_default();
    }

    pub(crate) fn destroy_collection(&mut self, name: &str) -> DriverResult<()> {
        self.collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DriverError::collection_not_found(name))
    }

    pub(crate) fn save_object(&mut self, collection: &str, id: &str, value: &Value) -> DriverResult<()> {
        let namespace = self.namespace_mut(collection)?;
        namespace.objects.insert(id.to_string(), without_id(value));
        Ok(())
    }

    pub(crate) fn save_objects(&mut self, collection: &str, documents: &[Value]) -> DriverResult<()> {
        // Validate the whole batch before touching anything
        let keyed = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                if !doc.is_dict() {
                    return Err(DriverError::invalid_document(format!(
                        "batch element {index} is a {}, not a dictionary",
                        doc.type_name()
                    )));
                }
                doc.get("id")
                    .and_then(Value::as_text)
                    .map(|id| (id.to_string(), without_id(doc)))
                    .ok_or_else(|| {
                        DriverError::invalid_document(format!(
                            "batch element {index} has no string 'id'"
                        ))
                    })
            })
            .collect::<DriverResult<Vec<_>>>()?;

        let namespace = self.namespace_mut(collection)?;
        namespace.objects.extend(keyed);
        Ok(())
    }

    pub(crate) fn get_object(&self, collection: &str, id: &str) -> DriverResult<Value> {
        self.namespace(collection)?
            .objects
            .get(id)
            .cloned()
            .ok_or_else(|| DriverError::not_found(collection, id))
    }

    pub(crate) fn delete_object(&mut self, collection: &str, id: &str) -> DriverResult<()> {
        self.namespace_mut(collection)?
            .objects
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DriverError::not_found(collection, id))
    }

    pub(crate) fn query(
        &self,
        collection: &str,
        rules: &Value,
        params: &QueryParams,
    ) -> DriverResult<SnapshotCursor> {
        let filter = Filter::parse(rules)?;
        let namespace = self.namespace(collection)?;
        Ok(SnapshotCursor::new(rules::select(
            &namespace.objects,
            &filter,
            params,
        )))
    }

    pub(crate) fn count(&self, collection: &str, filter: &Value) -> DriverResult<usize> {
        let filter = Filter::parse(filter)?;
        Ok(self
            .namespace(collection)?
            .objects
            .iter()
            .filter(|(id, value)| filter.matches(id, value))
            .count())
    }

    pub(crate) fn add_index(&mut self, collection: &str, index: &str, path: &str) -> DriverResult<()> {
        let namespace = self.namespace_mut(collection)?;
        if namespace.indexes.contains_key(index) {
            return Err(DriverError::IndexExists {
                collection: collection.to_string(),
                index: index.to_string(),
            });
        }
        namespace.indexes.insert(index.to_string(), path.to_string());
        Ok(())
    }

    pub(crate) fn drop_index(&mut self, collection: &str, index: &str) -> DriverResult<()> {
        self.namespace_mut(collection)?
            .indexes
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| DriverError::IndexNotFound {
                collection: collection.to_string(),
                index: index.to_string(),
            })
    }

    /// Serializes the store into a value for on-disk persistence.
    pub(crate) fn to_value(&self) -> Value {
        let collections: Dict = self
            .collections
            .iter()
            .map(|(name, ns)| {
                let indexes: Dict = ns
                    .indexes
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Text(v.clone())))
                    .collect();
                (
                    name.clone(),
                    Value::dict([
                        ("objects", Value::Dict(ns.objects.clone())),
                        ("indexes", Value::Dict(indexes)),
                    ]),
                )
            })
            .collect();

        Value::dict([
            ("format", Value::Integer(FORMAT_VERSION)),
            ("collections", Value::Dict(collections)),
        ])
    }

    /// Rebuilds a store from [`Store::to_value`] output.
    pub(crate) fn from_value(value: &Value) -> DriverResult<Self> {
        let corrupt = |what: &str| DriverError::other(format!("corrupt store: {what}"));

        match value.get("format").and_then(Value::as_integer) {
            Some(FORMAT_VERSION) => {}
            Some(other) => return Err(corrupt(&format!("unsupported format {other}"))),
            None => return Err(corrupt("missing format version")),
        }

        let collections = value
            .get("collections")
            .and_then(Value::as_dict)
            .ok_or_else(|| corrupt("missing collections"))?;

        let mut store = Store::default();
        for (name, entry) in collections {
            let objects = entry
                .get("objects")
                .and_then(Value::as_dict)
                .ok_or_else(|| corrupt(&format!("collection {name} has no objects")))?;
            let indexes = entry
                .get("indexes")
                .and_then(Value::as_dict)
                .ok_or_else(|| corrupt(&format!("collection {name} has no indexes")))?
                .iter()
                .map(|(index, path)| {
                    path.as_text()
                        .map(|p| (index.clone(), p.to_string()))
                        .ok_or_else(|| corrupt(&format!("index {index} has no path")))
                })
                .collect::<DriverResult<BTreeMap<_, _>>>()?;

            store.collections.insert(
                name.clone(),
                Namespace {
                    objects: objects.clone(),
                    indexes,
                },
            );
        }
        Ok(store)
    }
}

/// The stored form of a document carries no `id`; the key is the id.
fn without_id(value: &Value) -> Value {
    let mut stored = value.clone();
    stored.remove("id");
    stored
}

/// A store plus the snapshot taken when a transaction started.
#[derive(Debug, Default)]
pub(crate) struct TxStore {
    pub(crate) current: Store,
    snapshot: Option<Store>,
}

impl TxStore {
    pub(crate) fn new(current: Store) -> Self {
        Self {
            current,
            snapshot: None,
        }
    }

    pub(crate) fn in_tx(&self) -> bool {
        self.snapshot.is_some()
    }

    pub(crate) fn start(&mut self) -> DriverResult<()> {
        if self.snapshot.is_some() {
            return Err(DriverError::transaction("a transaction is already active"));
        }
        self.snapshot = Some(self.current.clone());
        Ok(())
    }

    pub(crate) fn commit(&mut self) -> DriverResult<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| DriverError::transaction("no active transaction to commit"))
    }

    pub(crate) fn rollback(&mut self) -> DriverResult<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| DriverError::transaction("no active transaction to roll back"))?;
        self.current = snapshot;
        Ok(())
    }
}

/// A cursor over rows captured when the query started.
///
/// Later writes to the collection are not visible through it.
#[derive(Debug)]
pub(crate) struct SnapshotCursor {
    rows: std::vec::IntoIter<(String, Value)>,
    closed: bool,
}

impl SnapshotCursor {
    pub(crate) fn new(rows: Vec<(String, Value)>) -> Self {
        Self {
            rows: rows.into_iter(),
            closed: false,
        }
    }
}

impl Cursor for SnapshotCursor {
    fn next(&mut self) -> DriverResult<Option<(String, Value)>> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        Ok(self.rows.next())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.rows = Vec::new().into_iter();
        Ok(())
    }
}
