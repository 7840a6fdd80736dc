//! Error types for driver operations.

use persist_value::CodecError;
use std::io;
use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors a driver can report.
///
/// `NotFound` must be used for a missing object so callers can tell a
/// miss apart from every other failure.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The object does not exist in the collection.
    #[error("object not found: {id} in collection {collection}")]
    NotFound {
        /// The collection searched.
        collection: String,
        /// The id that was not found.
        id: String,
    },

    /// The collection namespace does not exist.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Name of the collection.
        name: String,
    },

    /// The collection namespace already exists.
    #[error("collection already exists: {name}")]
    CollectionExists {
        /// Name of the collection.
        name: String,
    },

    /// The index does not exist.
    #[error("index not found: {index} on collection {collection}")]
    IndexNotFound {
        /// The collection.
        collection: String,
        /// The index name.
        index: String,
    },

    /// An index with this name already exists.
    #[error("index already exists: {index} on collection {collection}")]
    IndexExists {
        /// The collection.
        collection: String,
        /// The index name.
        index: String,
    },

    /// A document handed to the driver has the wrong shape.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// Query rules or params could not be interpreted.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of the problem.
        message: String,
    },

    /// The driver refused a transaction state change.
    #[error("transaction error: {message}")]
    Transaction {
        /// Description of the refusal.
        message: String,
    },

    /// The store is locked by another handle or process.
    #[error("store locked: {path}")]
    Locked {
        /// Path of the locked store.
        path: String,
    },

    /// The driver is not open, or has been closed.
    #[error("driver is closed")]
    Closed,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Stored data could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Any other driver-specific failure.
    #[error("{message}")]
    Other {
        /// Description of the failure.
        message: String,
    },
}

impl DriverError {
    /// Creates a not-found error.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Creates a collection-not-found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Creates a generic driver error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Returns true if this error reports a missing object or collection.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::CollectionNotFound { .. })
    }
}
