//! Document commands.

use super::{parse_json, print_json, CommandResult};
use persist_core::{Database, QueryParams, Value};
use serde::Serialize;
use tracing::debug;

/// Prints a document.
pub fn get(db: &Database, collection: &str, id: &str) -> CommandResult {
    let document = db.collection(collection, false)?.get(id)?;
    print_json(&document.as_value().to_json())
}

/// Saves one document, or a batch if the JSON is an array.
pub fn save(db: &Database, collection: &str, document: &str, create: bool) -> CommandResult {
    let value = parse_json("document", document)?;
    let collection = db.collection(collection, create)?;

    let saved = match &value {
        Value::Array(items) => {
            collection.save_many(&value)?;
            items.len()
        }
        _ => {
            collection.save(&value)?;
            1
        }
    };
    debug!(collection = collection.name(), documents = saved, "saved");
    println!("Saved {saved} document(s) to '{}'", collection.name());
    Ok(())
}

/// Deletes a document.
pub fn delete(db: &Database, collection: &str, id: &str) -> CommandResult {
    db.collection(collection, false)?.delete(id)?;
    println!("Deleted '{id}' from '{collection}'");
    Ok(())
}

#[derive(Debug, Serialize)]
struct CountResult<'a> {
    collection: &'a str,
    count: usize,
}

/// Counts matching documents.
pub fn count(db: &Database, collection: &str, filter: Option<&str>) -> CommandResult {
    let filter = filter
        .map(|text| parse_json("filter", text))
        .transpose()?
        .unwrap_or_default();
    let count = db.collection(collection, false)?.count(&filter)?;
    print_json(&CountResult { collection, count })
}

/// Arguments of the query command.
#[derive(Debug, Default)]
pub struct QueryArgs<'a> {
    /// Rules as JSON.
    pub rules: Option<&'a str>,
    /// Path to sort by.
    pub sort: Option<&'a str>,
    /// Reverse the sort.
    pub descending: bool,
    /// Maximum number of documents.
    pub limit: Option<usize>,
    /// Documents to skip.
    pub offset: usize,
}

impl QueryArgs<'_> {
    fn params(&self) -> QueryParams {
        let mut params = QueryParams::new()
            .descending(self.descending)
            .offset(self.offset);
        if let Some(sort) = self.sort {
            params = params.sort(sort);
        }
        if let Some(limit) = self.limit {
            params = params.limit(limit);
        }
        params
    }
}

/// Prints the matching documents as a JSON array.
pub fn query(db: &Database, collection: &str, args: &QueryArgs<'_>) -> CommandResult {
    let rules = args
        .rules
        .map(|text| parse_json("rules", text))
        .transpose()?
        .unwrap_or_default();

    let collection = db.collection(collection, false)?;
    let mut iter = collection.query(&rules, &args.params())?;
    let mut documents = Vec::new();
    while let Some(document) = iter.next_document()? {
        documents.push(document.as_value().to_json());
    }
    iter.close()?;
    debug!(collection = collection.name(), returned = documents.len(), "query finished");

    print_json(&documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_args_become_params() {
        let args = QueryArgs {
            rules: None,
            sort: Some("age"),
            descending: true,
            limit: Some(5),
            offset: 2,
        };
        assert_eq!(
            args.params(),
            QueryParams::new().sort("age").descending(true).offset(2).limit(5)
        );
        assert_eq!(QueryArgs::default().params(), QueryParams::default());
    }
}
