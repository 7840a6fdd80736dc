//! CBOR encoding for [`Value`].
//!
//! Values are mapped onto `ciborium`'s data model and serialized with it.
//! Dates are written as tag 0 (RFC 3339 text) so sub-second precision
//! survives a round trip; tag 1 (epoch seconds) is accepted on read.

use crate::error::{CodecError, CodecResult};
use crate::value::{Dict, Value};
use chrono::{DateTime, SecondsFormat, Utc};
use ciborium::value::{Integer, Value as Cbor};

const TAG_DATE_TEXT: u64 = 0;
const TAG_DATE_EPOCH: u64 = 1;

/// Encode a value to CBOR bytes.
///
/// # Errors
///
/// Returns an error if the serializer fails.
pub fn to_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::into_writer(&to_cbor_value(value), &mut buffer)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buffer)
}

/// Decode a value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR or contain items the
/// value model cannot represent (byte strings, non-text dictionary keys).
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let cbor: Cbor =
        ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))?;
    from_cbor_value(cbor)
}

fn to_cbor_value(value: &Value) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Integer(n) => Cbor::Integer(Integer::from(*n)),
        Value::Float(f) => Cbor::Float(*f),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Date(d) => Cbor::Tag(
            TAG_DATE_TEXT,
            Box::new(Cbor::Text(d.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
        ),
        Value::Array(items) => Cbor::Array(items.iter().map(to_cbor_value).collect()),
        Value::Dict(entries) => Cbor::Map(
            entries
                .iter()
                .map(|(k, v)| (Cbor::Text(k.clone()), to_cbor_value(v)))
                .collect(),
        ),
    }
}

fn from_cbor_value(cbor: Cbor) -> CodecResult<Value> {
    match cbor {
        Cbor::Null => Ok(Value::Null),
        Cbor::Bool(b) => Ok(Value::Bool(b)),
        Cbor::Integer(n) => i64::try_from(n)
            .map(Value::Integer)
            .map_err(|_| CodecError::IntegerOverflow),
        Cbor::Float(f) => Ok(Value::Float(f)),
        Cbor::Text(s) => Ok(Value::Text(s)),
        Cbor::Tag(TAG_DATE_TEXT, inner) => match *inner {
            Cbor::Text(s) => parse_rfc3339(&s).map(Value::Date),
            other => Err(CodecError::invalid_date(format!(
                "tag 0 wraps {}",
                cbor_type_name(&other)
            ))),
        },
        Cbor::Tag(TAG_DATE_EPOCH, inner) => epoch_to_date(&inner).map(Value::Date),
        // Unknown tags carry no meaning for the value model
        Cbor::Tag(_, inner) => from_cbor_value(*inner),
        Cbor::Array(items) => items
            .into_iter()
            .map(from_cbor_value)
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Array),
        Cbor::Map(entries) => {
            let mut dict = Dict::new();
            for (k, v) in entries {
                let key = match k {
                    Cbor::Text(key) => key,
                    other => {
                        return Err(CodecError::invalid_structure(format!(
                            "dictionary key must be text, found {}",
                            cbor_type_name(&other)
                        )))
                    }
                };
                dict.insert(key, from_cbor_value(v)?);
            }
            Ok(Value::Dict(dict))
        }
        other => Err(CodecError::unsupported_type(cbor_type_name(&other))),
    }
}

pub(crate) fn parse_rfc3339(s: &str) -> CodecResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| CodecError::invalid_date(e.to_string()))
}

#[allow(clippy::cast_possible_truncation)]
fn epoch_to_date(inner: &Cbor) -> CodecResult<DateTime<Utc>> {
    let parsed = match inner {
        Cbor::Integer(n) => i64::try_from(*n)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Cbor::Float(f) if f.is_finite() => {
            let secs = f.floor();
            let nanos = ((f - secs) * 1e9) as u32;
            DateTime::from_timestamp(secs as i64, nanos)
        }
        _ => None,
    };
    parsed.ok_or_else(|| CodecError::invalid_date("epoch timestamp out of range"))
}

fn cbor_type_name(cbor: &Cbor) -> &'static str {
    match cbor {
        Cbor::Integer(_) => "integer",
        Cbor::Bytes(_) => "bytes",
        Cbor::Float(_) => "float",
        Cbor::Text(_) => "text",
        Cbor::Bool(_) => "bool",
        Cbor::Null => "null",
        Cbor::Tag(_, _) => "tag",
        Cbor::Array(_) => "array",
        Cbor::Map(_) => "map",
        _ => "unknown",
    }
}
