//! Conversion between [`Value`] and JSON.
//!
//! JSON has no date type, so dates travel as `{"$date": "<RFC 3339>"}`.
//! Any single-key object of that shape with a parseable timestamp is read
//! back as a [`Value::Date`].

use crate::cbor::parse_rfc3339;
use crate::value::{Dict, Value};
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value as Json};

const DATE_KEY: &str = "$date";

impl Value {
    /// Convert this value to JSON.
    ///
    /// Non-finite floats have no JSON form and become `null`.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(n) => Json::Number(Number::from(*n)),
            Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::Text(s) => Json::String(s.clone()),
            Value::Date(d) => {
                let mut map = Map::new();
                map.insert(
                    DATE_KEY.to_string(),
                    Json::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                );
                Json::Object(map)
            }
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Dict(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                if map.len() == 1 {
                    if let Some(Json::String(s)) = map.get(DATE_KEY) {
                        if let Ok(date) = parse_rfc3339(s) {
                            return Value::Date(date);
                        }
                    }
                }
                Value::Dict(
                    map.into_iter()
                        .map(|(k, v)| (k, Value::from(v)))
                        .collect::<Dict>(),
                )
            }
        }
    }
}
