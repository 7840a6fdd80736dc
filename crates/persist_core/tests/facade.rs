//! End-to-end tests of the facade over the bundled drivers and a
//! deliberately faulty one.

use persist_core::{
    clear_last_error, dict, last_error, Config, Cursor, Database, Driver, DriverError,
    DriverRegistry, DriverResult, ErrorKind, MemoryDriver, QueryParams, Value,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A memory driver with injectable faults.
///
/// - saving the metadata record of a collection named `poison` fails
/// - the stored value of any id starting with `raw:` reads back as text
/// - opening with a config containing `fail` fails
/// - opening with a config containing `orphan` leaves a `poison` namespace
///   holding one document but no metadata record
/// - the first delete of the metadata record of `sticky` fails
struct Faulty {
    inner: MemoryDriver,
    calls: Arc<Calls>,
    sticky_tripped: AtomicBool,
}

/// Driver calls seen by every [`Faulty`] a registry creates.
#[derive(Default)]
struct Calls {
    document_saves: AtomicUsize,
    destroys: AtomicUsize,
}

impl Faulty {
    fn registry() -> DriverRegistry {
        Self::registry_with(Arc::default())
    }

    fn registry_with(calls: Arc<Calls>) -> DriverRegistry {
        let mut registry = DriverRegistry::default();
        registry.register("faulty", move || {
            Box::new(Faulty {
                inner: MemoryDriver::new(),
                calls: Arc::clone(&calls),
                sticky_tripped: AtomicBool::new(false),
            })
        });
        registry
    }
}

impl Driver for Faulty {
    fn name(&self) -> &str {
        "faulty"
    }

    fn open(&self, path: &str, config: &Value) -> DriverResult<()> {
        if config.get("fail").is_some() {
            return Err(DriverError::other("refusing to open"));
        }
        self.inner.open(path, config)?;
        if config.get("orphan").is_some() {
            self.inner.create_collection("poison")?;
            self.inner
                .save_object("poison", "keep", &dict! { "id" => "keep" })?;
        }
        Ok(())
    }

    fn close(&self) -> DriverResult<()> {
        self.inner.close()
    }

    fn create_collection(&self, name: &str) -> DriverResult<()> {
        self.inner.create_collection(name)
    }

    fn destroy_collection(&self, name: &str) -> DriverResult<()> {
        self.calls.destroys.fetch_add(1, Ordering::SeqCst);
        self.inner.destroy_collection(name)
    }

    fn save_object(&self, collection: &str, id: &str, value: &Value) -> DriverResult<()> {
        if collection == "collections" && id == "poison" {
            return Err(DriverError::other("disk full"));
        }
        if collection != "collections" {
            self.calls.document_saves.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.save_object(collection, id, value)
    }

    fn save_objects(&self, collection: &str, documents: &[Value]) -> DriverResult<()> {
        self.calls.document_saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_objects(collection, documents)
    }

    fn get_object(&self, collection: &str, id: &str) -> DriverResult<Value> {
        let value = self.inner.get_object(collection, id)?;
        if id.starts_with("raw:") {
            return Ok(Value::from("not a dict"));
        }
        Ok(value)
    }

    fn delete_object(&self, collection: &str, id: &str) -> DriverResult<()> {
        if collection == "collections"
            && id == "sticky"
            && !self.sticky_tripped.swap(true, Ordering::SeqCst)
        {
            return Err(DriverError::other("io error"));
        }
        self.inner.delete_object(collection, id)
    }

    fn query(
        &self,
        collection: &str,
        rules: &Value,
        params: &QueryParams,
    ) -> DriverResult<Box<dyn Cursor>> {
        self.inner.query(collection, rules, params)
    }

    fn count(&self, collection: &str, filter: &Value) -> DriverResult<usize> {
        self.inner.count(collection, filter)
    }

    fn add_index(&self, collection: &str, index: &str, path: &str) -> DriverResult<()> {
        self.inner.add_index(collection, index, path)
    }

    fn drop_index(&self, collection: &str, index: &str) -> DriverResult<()> {
        self.inner.drop_index(collection, index)
    }

    fn start_tx(&self) -> DriverResult<()> {
        self.inner.start_tx()
    }

    fn commit_tx(&self) -> DriverResult<()> {
        self.inner.commit_tx()
    }

    fn rollback_tx(&self) -> DriverResult<()> {
        self.inner.rollback_tx()
    }

    fn in_tx(&self) -> bool {
        self.inner.in_tx()
    }
}

fn open_faulty() -> Database {
    Database::open_with_registry("faulty", &Config::new("faulty"), &Faulty::registry()).unwrap()
}

fn file_config() -> Config {
    Config::new("file").option("sync", false)
}

fn file_path(dir: &TempDir) -> String {
    dir.path().join("store.db").to_str().unwrap().to_string()
}

#[test]
fn memory_store_scenario() {
    let db = Database::open("scenario", "mem", &Value::Null).unwrap();
    let users = db.collection("users", true).unwrap();

    users.save(&dict! { "id" => "1", "name" => "Ann" }).unwrap();
    assert_eq!(users.count(&Value::Null).unwrap(), 1);
    assert_eq!(
        users.get("1").unwrap(),
        dict! { "id" => "1", "name" => "Ann" }
    );

    users.delete("1").unwrap();
    let err = users.get("1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    drop(users);
    db.close().unwrap();
}

#[test]
fn rolled_back_saves_are_invisible() {
    let db = Database::open("rollback", "mem", &Value::Null).unwrap();
    let users = db.collection("users", true).unwrap();

    db.start_transaction().unwrap();
    users.save(&dict! { "id" => "1" }).unwrap();
    users.save(&dict! { "id" => "2" }).unwrap();
    db.rollback_transaction().unwrap();

    assert_eq!(users.count(&Value::Null).unwrap(), 0);
}

#[test]
fn exists_and_metadata_after_create() {
    let db = Database::open("meta", "mem", &Value::Null).unwrap();
    assert!(!db.collection_exists("users"));

    db.collection("users", true).unwrap();
    assert!(db.collection_exists("users"));
    assert_eq!(db.collection_metadata("users").unwrap(), dict! {});

    let meta = dict! { "schema" => "v2", "tags" => vec!["a", "b"] };
    db.set_collection_metadata("users", &meta).unwrap();
    assert_eq!(db.collection_metadata("users").unwrap(), meta);
}

#[test]
fn save_rejects_non_documents_without_reaching_the_driver() {
    let db = Database::open("bad", "mem", &Value::Null).unwrap();
    let users = db.collection("users", true).unwrap();

    clear_last_error();
    for bad in [Value::Null, Value::from(3), Value::empty_array()] {
        let err = users.save(&bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
    assert_eq!(last_error().unwrap().kind, ErrorKind::InvalidArgument);
    assert_eq!(users.count(&Value::Null).unwrap(), 0);
}

#[test]
fn non_dict_save_never_calls_the_driver() {
    let calls = Arc::new(Calls::default());
    let registry = Faulty::registry_with(Arc::clone(&calls));
    let db = Database::open_with_registry("spy", &Config::new("faulty"), &registry).unwrap();
    let users = db.collection("users", true).unwrap();

    for bad in [Value::from("text"), Value::from(vec![1, 2])] {
        assert_eq!(users.save(&bad).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
    assert_eq!(calls.document_saves.load(Ordering::SeqCst), 0);

    users.save(&dict! { "id" => "1" }).unwrap();
    assert_eq!(calls.document_saves.load(Ordering::SeqCst), 1);
}

#[test]
fn query_with_malformed_rules_is_invalid_argument() {
    let db = Database::open("rules", "mem", &Value::Null).unwrap();
    let users = db.collection("users", true).unwrap();

    clear_last_error();
    let err = users
        .query(&Value::from("age > 3"), &QueryParams::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(last_error().unwrap().kind, ErrorKind::InvalidArgument);
}

#[test]
fn iterator_exhaustion_is_not_an_error() {
    let db = Database::open("iter", "mem", &Value::Null).unwrap();
    let users = db.collection("users", true).unwrap();
    users
        .save_many(&Value::from(vec![
            dict! { "id" => "1" },
            dict! { "id" => "2" },
        ]))
        .unwrap();

    let mut iter = users.query(&Value::Null, &QueryParams::default()).unwrap();
    let mut seen = 0;
    while let Some(doc) = iter.next_document().unwrap() {
        assert!(["1", "2"].contains(&doc.id()));
        seen += 1;
    }
    assert_eq!(seen, 2);
    assert!(iter.next_document().unwrap().is_none());
    iter.close().unwrap();
}

#[test]
fn unknown_driver_is_reported() {
    clear_last_error();
    let err = Database::open("x", "nope", &Value::Null).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DriverNotFound);
    assert_eq!(err.kind().code(), 1);

    let last = last_error().unwrap();
    assert_eq!(last.kind, ErrorKind::DriverNotFound);
    assert!(last.message.contains("nope"));
}

#[test]
fn driver_open_failure_is_init_error() {
    let config = Config::new("faulty").option("fail", true);
    let err = Database::open_with_registry("x", &config, &Faulty::registry()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DriverInitError);

    let dir = tempfile::tempdir().unwrap();
    let err = Database::open(&file_path(&dir), "file", &Value::from("sync")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DriverInitError);
}

#[test]
fn failed_metadata_write_leaves_no_namespace() {
    let db = open_faulty();

    let err = db.collection("poison", true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CollectionInitError);
    assert!(!db.collection_exists("poison"));

    // The namespace was destroyed too, not just left without a record.
    let err = db.remove_collection("poison").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn failed_create_keeps_documents_of_an_orphan_namespace() {
    let calls = Arc::new(Calls::default());
    let config = Config::new("faulty").option("orphan", true);
    let registry = Faulty::registry_with(Arc::clone(&calls));
    let db = Database::open_with_registry("orphan", &config, &registry).unwrap();

    let err = db.collection("poison", true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CollectionInitError);
    assert_eq!(calls.destroys.load(Ordering::SeqCst), 0);
    assert!(!db.collection_exists("poison"));

    // The namespace is still there, so removing it succeeds.
    db.remove_collection("poison").unwrap();
    assert_eq!(calls.destroys.load(Ordering::SeqCst), 1);
}

#[test]
fn interrupted_remove_can_be_retried() {
    let db = open_faulty();
    let sticky = db.collection("sticky", true).unwrap();
    sticky.save(&dict! { "id" => "1" }).unwrap();
    drop(sticky);

    let err = db.remove_collection("sticky").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DriverError);
    assert!(db.collection_exists("sticky"));

    db.remove_collection("sticky").unwrap();
    assert!(!db.collection_exists("sticky"));
    assert_eq!(
        db.remove_collection("sticky").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn non_dict_from_driver_is_invalid_type() {
    let db = open_faulty();
    let docs = db.collection("docs", true).unwrap();
    docs.save(&dict! { "id" => "raw:1" }).unwrap();

    let err = docs.get("raw:1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidType);
}

#[test]
fn remove_then_exists_is_false() {
    let db = Database::open("rm", "mem", &Value::Null).unwrap();
    db.collection("users", true).unwrap();
    db.remove_collection("users").unwrap();

    assert!(!db.collection_exists("users"));
    assert_eq!(
        db.collection("users", false).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(db.collection_names().unwrap(), Vec::<String>::new());
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = file_path(&dir);

    {
        let db = Database::open_with_config(&path, &file_config()).unwrap();
        let users = db.collection("users", true).unwrap();
        db.set_collection_metadata("users", &dict! { "owner" => "ops" })
            .unwrap();

        db.transaction(|_| {
            users.save(&dict! { "id" => "1", "name" => "Ann" })?;
            users.save(&dict! { "id" => "2", "name" => "Bob" })
        })
        .unwrap();

        db.start_transaction().unwrap();
        users.save(&dict! { "id" => "3", "name" => "Cy" }).unwrap();
        db.rollback_transaction().unwrap();

        drop(users);
        db.close().unwrap();
    }

    let db = Database::open_with_config(&path, &file_config()).unwrap();
    assert_eq!(db.collection_names().unwrap(), ["users"]);
    assert_eq!(
        db.collection_metadata("users").unwrap(),
        dict! { "owner" => "ops" }
    );

    let users = db.collection("users", false).unwrap();
    assert_eq!(users.count(&Value::Null).unwrap(), 2);
    assert_eq!(users.get("2").unwrap().get("name"), Some(&Value::from("Bob")));
    assert_eq!(users.get("3").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn file_store_is_exclusive_until_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = file_path(&dir);

    let first = Database::open_with_config(&path, &file_config()).unwrap();
    let err = Database::open_with_config(&path, &file_config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DriverInitError);

    drop(first);
    Database::open_with_config(&path, &file_config())
        .unwrap()
        .close()
        .unwrap();
}

#[test]
fn custom_registry_keeps_bundled_drivers() {
    let db =
        Database::open_with_registry("x", &Config::new("mem"), &Faulty::registry()).unwrap();
    assert_eq!(db.driver_name(), "mem");
}
