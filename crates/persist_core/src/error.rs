//! Error types for the persistence facade.

use persist_driver::DriverError;
use std::fmt;
use thiserror::Error;

/// Result type for facade operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Stable numeric classification of a failure.
///
/// The codes are part of the public contract and never change meaning.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No registered driver has the requested name.
    DriverNotFound = 1,
    /// The driver's open step failed.
    DriverInitError = 2,
    /// A collection namespace or its metadata could not be created.
    CollectionInitError = 3,
    /// A collection or document does not exist.
    NotFound = 4,
    /// A value handed to the facade has the wrong shape.
    InvalidArgument = 5,
    /// The driver returned a value of an unexpected shape.
    InvalidType = 6,
    /// The driver refused a transaction state change.
    TransactionError = 7,
    /// Any other driver failure, passed through.
    DriverError = 8,
}

impl ErrorKind {
    /// Returns the numeric code of this kind.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Looks up a kind by numeric code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::DriverNotFound),
            2 => Some(Self::DriverInitError),
            3 => Some(Self::CollectionInitError),
            4 => Some(Self::NotFound),
            5 => Some(Self::InvalidArgument),
            6 => Some(Self::InvalidType),
            7 => Some(Self::TransactionError),
            8 => Some(Self::DriverError),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DriverNotFound => "driver not found",
            Self::DriverInitError => "driver init error",
            Self::CollectionInitError => "collection init error",
            Self::NotFound => "not found",
            Self::InvalidArgument => "invalid argument",
            Self::InvalidType => "invalid type",
            Self::TransactionError => "transaction error",
            Self::DriverError => "driver error",
        };
        f.write_str(name)
    }
}

/// Errors returned by facade operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// No registered driver has the requested name.
    #[error("driver not found: {name}")]
    DriverNotFound {
        /// The requested driver name.
        name: String,
    },

    /// The driver's open step failed.
    #[error("driver '{driver}' failed to open: {source}")]
    DriverInit {
        /// The driver name.
        driver: String,
        /// The driver's error.
        #[source]
        source: DriverError,
    },

    /// A collection namespace or its metadata record could not be created.
    #[error("collection '{name}' could not be initialized: {source}")]
    CollectionInit {
        /// The collection name.
        name: String,
        /// The driver's error.
        #[source]
        source: DriverError,
    },

    /// A collection or document does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// What was missing.
        message: String,
    },

    /// A value handed to the facade has the wrong shape.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The driver returned a value of an unexpected shape.
    #[error("invalid type: {message}")]
    InvalidType {
        /// Description of the problem.
        message: String,
    },

    /// The driver refused a transaction state change.
    #[error("transaction error: {source}")]
    Transaction {
        /// The driver's error.
        #[source]
        source: DriverError,
    },

    /// Any other driver failure.
    #[error("driver error: {source}")]
    Driver {
        /// The driver's error.
        #[source]
        source: DriverError,
    },
}

impl PersistError {
    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DriverNotFound { .. } => ErrorKind::DriverNotFound,
            Self::DriverInit { .. } => ErrorKind::DriverInitError,
            Self::CollectionInit { .. } => ErrorKind::CollectionInitError,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::InvalidType { .. } => ErrorKind::InvalidType,
            Self::Transaction { .. } => ErrorKind::TransactionError,
            Self::Driver { .. } => ErrorKind::DriverError,
        }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a not-found error for a collection.
    pub fn collection_not_found(name: &str) -> Self {
        Self::not_found(format!("collection '{name}'"))
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid type error.
    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::InvalidType {
            message: message.into(),
        }
    }

    /// Wraps any driver failure of a transaction operation.
    pub fn transaction(source: DriverError) -> Self {
        Self::Transaction { source }
    }
}

/// Driver errors keep their kind where the facade can tell them apart.
impl From<DriverError> for PersistError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotFound { .. } | DriverError::CollectionNotFound { .. } => {
                Self::not_found(err.to_string())
            }
            DriverError::InvalidDocument { .. } | DriverError::InvalidQuery { .. } => {
                Self::invalid_argument(err.to_string())
            }
            DriverError::Transaction { .. } => Self::Transaction { source: err },
            other => Self::Driver { source: other },
        }
    }
}
