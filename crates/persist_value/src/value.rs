//! Dynamic structured value type.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A string-keyed dictionary of values.
pub type Dict = BTreeMap<String, Value>;

/// A dynamic structured value.
///
/// This is the value model every document, query rule, and driver
/// configuration is expressed in. Dictionaries are keyed by strings and
/// kept sorted, so two dictionaries with the same entries are equal
/// regardless of insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Double precision float.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Point in time, UTC.
    Date(DateTime<Utc>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// String-keyed dictionary.
    Dict(Dict),
}

impl Value {
    /// Create a dictionary value from key-value pairs.
    ///
    /// Later pairs overwrite earlier ones with the same key.
    pub fn dict<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Dict(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Create an empty dictionary value.
    #[must_use]
    pub fn empty_dict() -> Self {
        Value::Dict(Dict::new())
    }

    /// Create an empty array value.
    #[must_use]
    pub fn empty_array() -> Self {
        Value::Array(Vec::new())
    }

    /// Returns the name of this value's type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Dict(_) => "dictionary",
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a dictionary.
    pub fn is_dict(&self) -> bool {
        matches!(self, Value::Dict(_))
    }

    /// Check if this value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float. Integers are widened.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a date, if it is one.
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a dictionary, if it is one.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Get this value as a mutable dictionary, if it is one.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Look up a key in this dictionary value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// Look up a dotted path such as `address.city` or `tags.0`.
    ///
    /// Numeric segments index into arrays; other segments index into
    /// dictionaries. An empty path refers to the value itself.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.').try_fold(self, |current, segment| match current {
            Value::Dict(d) => d.get(segment),
            Value::Array(a) => segment.parse::<usize>().ok().and_then(|i| a.get(i)),
            _ => None,
        })
    }

    /// Set a key on this dictionary value.
    ///
    /// Returns `false` (and leaves the value untouched) if this is not a
    /// dictionary.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        match self {
            Value::Dict(d) => {
                d.insert(key.into(), value.into());
                true
            }
            _ => false,
        }
    }

    /// Remove a key from this dictionary value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.as_dict_mut().and_then(|d| d.remove(key))
    }

    /// Total ordering used for sorting and comparison rules.
    ///
    /// Values of different kinds order by kind
    /// (null < bool < number < string < date < array < dictionary).
    /// Integers and floats compare numerically with each other.
    pub fn cmp_total(&self, other: &Self) -> Ordering {
        let (self_rank, other_rank) = (self.rank(), other.rank());
        if self_rank != other_rank {
            return self_rank.cmp(&other_rank);
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => {
                for (av, bv) in a.iter().zip(b.iter()) {
                    let ord = av.cmp_total(bv);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Dict(a), Value::Dict(b)) => {
                for ((ak, av), (bk, bv)) in a.iter().zip(b.iter()) {
                    let key_ord = ak.cmp(bk);
                    if key_ord != Ordering::Equal {
                        return key_ord;
                    }
                    let val_ord = av.cmp_total(bv);
                    if val_ord != Ordering::Equal {
                        return val_ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            // Mixed integer/float, or float/float
            _ => match (self.as_float(), other.as_float()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }

    /// Equality under [`Value::cmp_total`], so `1` equals `1.0`.
    pub fn loosely_equals(&self, other: &Self) -> bool {
        self.cmp_total(other) == Ordering::Equal
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::Date(_) => 4,
            Value::Array(_) => 5,
            Value::Dict(_) => 6,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Dict(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}
