//! Error types for the value crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode value to CBOR.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Invalid value structure (e.g. a dictionary with non-text keys).
    #[error("invalid structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// A CBOR item with no counterpart in the value model.
    #[error("unsupported CBOR type: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported type.
        type_name: String,
    },

    /// A date could not be parsed or is out of range.
    #[error("invalid date: {message}")]
    InvalidDate {
        /// Description of the date error.
        message: String,
    },

    /// Integer does not fit in 64 bits.
    #[error("integer overflow")]
    IntegerOverflow,
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Create an invalid date error.
    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::InvalidDate {
            message: message.into(),
        }
    }
}
