//! Collection management commands.

use super::{parse_json, print_json, CommandResult};
use persist_core::{CollectionRecord, Database, Value};
use serde::Serialize;
use tracing::debug;

/// One entry of the collection listing.
#[derive(Debug, Serialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Creation time, RFC 3339.
    pub created_at: String,
    /// Number of documents.
    pub documents: usize,
    /// Number of recorded migrations.
    pub migrations: usize,
    /// Application metadata.
    pub metadata: serde_json::Value,
}

impl CollectionInfo {
    fn new(name: String, record: CollectionRecord, documents: usize) -> Self {
        Self {
            name,
            created_at: record.created_at.to_rfc3339(),
            documents,
            migrations: record.migrations.len(),
            metadata: Value::Dict(record.metadata).to_json(),
        }
    }
}

/// Lists every collection with its record.
pub fn list(db: &Database, format: &str) -> CommandResult {
    let mut infos = Vec::new();
    for name in db.collection_names()? {
        let record = db.collection_record(&name)?;
        let documents = db.collection(&name, false)?.count(&Value::Null)?;
        infos.push(CollectionInfo::new(name, record, documents));
    }
    debug!(collections = infos.len(), format, "listing collections");

    match format {
        "text" => print_text_output(&infos),
        _ => print_json(&infos)?,
    }
    Ok(())
}

fn print_text_output(infos: &[CollectionInfo]) {
    if infos.is_empty() {
        println!("No collections");
        return;
    }
    println!("{:<24} {:>10}  Created", "Collection", "Documents");
    println!("{}", "-".repeat(64));
    for info in infos {
        println!("{:<24} {:>10}  {}", info.name, info.documents, info.created_at);
    }
}

/// Creates a collection (a no-op if it exists).
pub fn create(db: &Database, collection: &str) -> CommandResult {
    let existed = db.collection_exists(collection);
    db.collection(collection, true)?;
    if existed {
        println!("Collection '{collection}' already exists");
    } else {
        println!("Created collection '{collection}'");
    }
    Ok(())
}

/// Removes a collection.
pub fn remove(db: &Database, collection: &str) -> CommandResult {
    db.remove_collection(collection)?;
    println!("Removed collection '{collection}'");
    Ok(())
}

/// Prints the metadata of a collection, replacing it first if `set` is given.
pub fn metadata(db: &Database, collection: &str, set: Option<&str>) -> CommandResult {
    if let Some(text) = set {
        let metadata = parse_json("metadata", text)?;
        db.set_collection_metadata(collection, &metadata)?;
    }
    print_json(&db.collection_metadata(collection)?.to_json())
}
