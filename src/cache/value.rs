//! Cache Value Module
//!
//! Tagged-union representation of everything the cache can hold. Dates are a
//! first-class variant; in JSON form they are written as
//! `{"__type": "Date", "value": "<RFC 3339>"}` so they survive a round trip.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::{CacheError, Result};

/// Tag key marking a typed JSON object
pub const TYPE_TAG: &str = "__type";

/// Tag value for dates
pub const DATE_TAG: &str = "Date";

/// Tag value for mappings that carry their own `__type` key
pub const MAP_TAG: &str = "Map";

/// Last year an RFC 3339 timestamp can hold
const MAX_DATE_YEAR: i32 = 9999;

// == Cache Value ==
/// A structured value stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Date(DateTime<Utc>),
    Sequence(Vec<CacheValue>),
    Mapping(BTreeMap<String, CacheValue>),
}

impl CacheValue {
    /// Builds a number from a float. Returns `None` for NaN and infinities,
    /// which have no JSON representation.
    pub fn float(value: f64) -> Option<Self> {
        Number::from_f64(value).map(CacheValue::Number)
    }

    /// Builds a mapping from `(key, value)` pairs.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, CacheValue)>,
    {
        CacheValue::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the field of a mapping.
    pub fn get(&self, field: &str) -> Option<&CacheValue> {
        match self {
            CacheValue::Mapping(map) => map.get(field),
            _ => None,
        }
    }

    // == JSON Conversion ==
    /// Converts to JSON, tagging every date.
    ///
    /// A mapping that itself holds a `__type` key is wrapped as
    /// `{"__type": "Map", "value": {...}}` so it cannot be mistaken for a
    /// tagged value on the way back.
    pub fn to_json(&self) -> Value {
        match self {
            CacheValue::Null => Value::Null,
            CacheValue::Bool(b) => Value::Bool(*b),
            CacheValue::Number(n) => Value::Number(n.clone()),
            CacheValue::String(s) => Value::String(s.clone()),
            CacheValue::Date(date) => tagged(
                DATE_TAG,
                Value::String(date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ),
            CacheValue::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            CacheValue::Mapping(map) => {
                let object: Map<String, Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                if object.contains_key(TYPE_TAG) {
                    tagged(MAP_TAG, Value::Object(object))
                } else {
                    Value::Object(object)
                }
            }
        }
    }

    /// Converts from JSON, restoring tagged dates and escaped mappings.
    ///
    /// A tagged date whose `value` is not a valid RFC 3339 timestamp is an
    /// error rather than being passed through as a plain mapping.
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(match value {
            Value::Null => CacheValue::Null,
            Value::Bool(b) => CacheValue::Bool(b),
            Value::Number(n) => CacheValue::Number(n),
            Value::String(s) => CacheValue::String(s),
            Value::Array(items) => CacheValue::Sequence(
                items
                    .into_iter()
                    .map(Self::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(map) => Self::from_object(map)?,
        })
    }

    fn from_object(mut map: Map<String, Value>) -> Result<Self> {
        let tag = match (map.len(), map.get(TYPE_TAG)) {
            (2, Some(Value::String(tag))) => Some(tag.clone()),
            _ => None,
        };
        match tag.as_deref() {
            Some(DATE_TAG) => {
                if let Some(Value::String(raw)) = map.get("value") {
                    return parse_date(raw).map(CacheValue::Date);
                }
            }
            Some(MAP_TAG) if matches!(map.get("value"), Some(Value::Object(_))) => {
                if let Some(Value::Object(inner)) = map.remove("value") {
                    return mapping_from(inner);
                }
            }
            _ => {}
        }
        mapping_from(map)
    }

    // == Encodability ==
    /// Fails with `Serialization` for values whose JSON form could not be
    /// read back: dates outside years 0 through 9999, which RFC 3339 cannot
    /// express.
    pub fn check_encodable(&self) -> Result<()> {
        match self {
            CacheValue::Date(date) if !(0..=MAX_DATE_YEAR).contains(&date.year()) => {
                Err(CacheError::Serialization(format!(
                    "date {} is outside the representable year range",
                    date
                )))
            }
            CacheValue::Sequence(items) => items.iter().try_for_each(Self::check_encodable),
            CacheValue::Mapping(map) => map.values().try_for_each(Self::check_encodable),
            _ => Ok(()),
        }
    }

    /// Rough size of the JSON form in bytes, used to decide whether encoding
    /// is worth moving off the async executor.
    pub fn estimated_size(&self) -> usize {
        match self {
            CacheValue::Null | CacheValue::Bool(_) => 5,
            CacheValue::Number(_) => 24,
            CacheValue::String(s) => s.len() + 2,
            CacheValue::Date(_) => 64,
            CacheValue::Sequence(items) => {
                2 + items.iter().map(|v| v.estimated_size() + 1).sum::<usize>()
            }
            CacheValue::Mapping(map) => {
                2 + map
                    .iter()
                    .map(|(k, v)| k.len() + 4 + v.estimated_size())
                    .sum::<usize>()
            }
        }
    }
}

fn tagged(tag: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(TYPE_TAG.to_string(), Value::String(tag.to_string()));
    object.insert("value".to_string(), value);
    Value::Object(object)
}

fn mapping_from(map: Map<String, Value>) -> Result<CacheValue> {
    Ok(CacheValue::Mapping(
        map.into_iter()
            .map(|(k, v)| Ok((k, CacheValue::from_json(v)?)))
            .collect::<Result<BTreeMap<_, _>>>()?,
    ))
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| CacheError::Deserialization(format!("invalid date {:?}: {}", raw, e)))
}

// == Serde ==
impl Serialize for CacheValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CacheValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = Value::deserialize(deserializer)?;
        CacheValue::from_json(json).map_err(serde::de::Error::custom)
    }
}

// == Conversions ==
impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Bool(value)
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        CacheValue::Number(value.into())
    }
}

impl From<u64> for CacheValue {
    fn from(value: u64) -> Self {
        CacheValue::Number(value.into())
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::String(value.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::String(value)
    }
}

impl From<DateTime<Utc>> for CacheValue {
    fn from(value: DateTime<Utc>) -> Self {
        CacheValue::Date(value)
    }
}

impl From<Vec<CacheValue>> for CacheValue {
    fn from(value: Vec<CacheValue>) -> Self {
        CacheValue::Sequence(value)
    }
}
