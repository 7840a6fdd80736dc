//! # Persist Value
//!
//! The structured value model shared by every layer of Persist.
//!
//! A [`Value`] is a tagged union of null, bool, integer, float, string,
//! date, ordered sequence, and string-keyed dictionary. Documents, query
//! rules, query filters, and driver configuration are all values.
//!
//! This crate also provides:
//! - CBOR encoding ([`to_cbor`], [`from_cbor`]) used by on-disk drivers
//! - A JSON bridge (`Value::to_json`, `From<serde_json::Value>`)
//! - The [`dict!`] macro for building dictionaries inline
//!
//! ## Usage
//!
//! ```
//! use persist_value::{dict, from_cbor, to_cbor, Value};
//!
//! let doc = dict! { "id" => "1", "name" => "Ann" };
//! let bytes = to_cbor(&doc).unwrap();
//! let decoded: Value = from_cbor(&bytes).unwrap();
//! assert_eq!(doc, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod json;
mod value;

pub use cbor::{from_cbor, to_cbor};
pub use error::{CodecError, CodecResult};
pub use value::{Dict, Value};

/// Build a [`Value::Dict`] from `key => value` pairs.
///
/// Keys are anything convertible to `String`; values anything
/// convertible to [`Value`].
///
/// ```
/// use persist_value::{dict, Value};
///
/// let empty = dict! {};
/// assert_eq!(empty, Value::empty_dict());
///
/// let doc = dict! { "id" => "7", "age" => 30 };
/// assert_eq!(doc.get("age"), Some(&Value::Integer(30)));
/// ```
#[macro_export]
macro_rules! dict {
    () => {
        $crate::Value::Dict($crate::Dict::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut entries = $crate::Dict::new();
        $(
            entries.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        $crate::Value::Dict(entries)
    }};
}

/// Trait for types that can be encoded to CBOR.
pub trait Encode {
    /// Encode this value to CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from CBOR.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_cbor(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}
