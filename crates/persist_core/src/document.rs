//! Documents: dictionary values keyed by a string `id`.

use crate::error::{PersistError, PersistResult};
use persist_value::{Dict, Value};

/// Key under which every document carries its identifier.
pub const ID_KEY: &str = "id";

/// A document read back from a collection.
///
/// Always a dictionary with a string `id`. Drivers store the id as the
/// external key; it is re-injected here on every read.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    value: Value,
}

impl Document {
    /// Builds a document from a stored value and its external key.
    ///
    /// Fails with `InvalidType` if the driver handed back anything other
    /// than a dictionary.
    pub(crate) fn from_stored(id: &str, mut value: Value) -> PersistResult<Self> {
        if !value.set(ID_KEY, id) {
            return Err(PersistError::invalid_type(format!(
                "document '{id}' is stored as {}, expected dict",
                value.type_name()
            )));
        }
        Ok(Self { value })
    }

    /// Returns the document id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.value
            .get(ID_KEY)
            .and_then(Value::as_text)
            .unwrap_or_default()
    }

    /// Returns a field by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// Returns a field by dotted path (`address.city`, `tags.0`).
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        self.value.get_path(path)
    }

    /// Iterates over all fields, `id` included, in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.value
            .as_dict()
            .into_iter()
            .flat_map(Dict::iter)
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Borrows the document as a value, ready to be saved again.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Unwraps the document into its value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Checks the write-side entry condition and returns the document id.
pub(crate) fn document_id(value: &Value) -> PersistResult<&str> {
    let Some(fields) = value.as_dict() else {
        return Err(PersistError::invalid_argument(format!(
            "document must be a dict, got {}",
            value.type_name()
        )));
    };
    match fields.get(ID_KEY) {
        Some(Value::Text(id)) => Ok(id.as_str()),
        Some(other) => Err(PersistError::invalid_argument(format!(
            "document id must be a string, got {}",
            other.type_name()
        ))),
        None => Err(PersistError::invalid_argument("document has no id")),
    }
}

impl AsRef<Value> for Document {
    fn as_ref(&self) -> &Value {
        &self.value
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        document.value
    }
}

impl TryFrom<Value> for Document {
    type Error = PersistError;

    fn try_from(value: Value) -> PersistResult<Self> {
        document_id(&value)?;
        Ok(Self { value })
    }
}

impl PartialEq<Value> for Document {
    fn eq(&self, other: &Value) -> bool {
        &self.value == other
    }
}
