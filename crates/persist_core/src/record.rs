//! Per-collection metadata records kept in the reserved collection.

use crate::error::{PersistError, PersistResult};
use chrono::{DateTime, Utc};
use persist_value::{Dict, Value};

/// Metadata about one user collection.
///
/// Stored under the collection's name in the reserved `collections`
/// collection as `{created_at, migrations, metadata}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRecord {
    /// When the collection was created.
    pub created_at: DateTime<Utc>,
    /// Applied migrations. Reserved; the facade never writes to it.
    pub migrations: Vec<Value>,
    /// Application metadata.
    pub metadata: Dict,
}

impl CollectionRecord {
    pub(crate) const CREATED_AT: &'static str = "created_at";
    pub(crate) const MIGRATIONS: &'static str = "migrations";
    pub(crate) const METADATA: &'static str = "metadata";

    /// A fresh record stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            migrations: Vec::new(),
            metadata: Dict::new(),
        }
    }

    /// Encodes the record as stored.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::dict([
            (Self::CREATED_AT, Value::Date(self.created_at)),
            (Self::MIGRATIONS, Value::Array(self.migrations.clone())),
            (Self::METADATA, Value::Dict(self.metadata.clone())),
        ])
    }

    /// Decodes a stored record.
    ///
    /// Missing `migrations` or `metadata` read as empty. A missing or
    /// mistyped `created_at`, or any mistyped field, is `InvalidType`.
    pub fn from_value(value: &Value) -> PersistResult<Self> {
        if !value.is_dict() {
            return Err(PersistError::invalid_type(format!(
                "collection record must be a dict, got {}",
                value.type_name()
            )));
        }

        let created_at = value
            .get(Self::CREATED_AT)
            .and_then(Value::as_date)
            .ok_or_else(|| PersistError::invalid_type("collection record has no created_at date"))?;

        let migrations = match value.get(Self::MIGRATIONS) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => {
                return Err(PersistError::invalid_type(format!(
                    "migrations must be an array, got {}",
                    other.type_name()
                )))
            }
        };

        let metadata = match value.get(Self::METADATA) {
            None | Some(Value::Null) => Dict::new(),
            Some(Value::Dict(fields)) => fields.clone(),
            Some(other) => {
                return Err(PersistError::invalid_type(format!(
                    "metadata must be a dict, got {}",
                    other.type_name()
                )))
            }
        };

        Ok(Self {
            created_at,
            migrations,
            metadata,
        })
    }
}

impl Default for CollectionRecord {
    fn default() -> Self {
        Self::new()
    }
}
