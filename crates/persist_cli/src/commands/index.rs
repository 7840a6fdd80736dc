//! Index commands.

use super::CommandResult;
use persist_core::Database;

/// Adds an index on `path`.
pub fn add(db: &Database, collection: &str, index: &str, path: &str) -> CommandResult {
    db.collection(collection, false)?.add_index(index, path)?;
    println!("Added index '{index}' on '{collection}.{path}'");
    Ok(())
}

/// Drops an index.
pub fn remove(db: &Database, collection: &str, index: &str) -> CommandResult {
    db.collection(collection, false)?.drop_index(index)?;
    println!("Dropped index '{index}' from '{collection}'");
    Ok(())
}
