//! Cached values and their wide-integer-safe serialization.
//!
//! JSON numbers cannot carry 256-bit integers exactly, so every [`U256`] is
//! wrapped as `{"$bigint": "<decimal>"}` before serialization and unwrapped
//! again on the way back. The walk is recursive: wide integers nested at any
//! depth inside lists and maps survive a round trip unchanged.

use crate::{Error, Result};
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Object key marking a tagged wide integer.
pub const WIDE_INTEGER_TAG: &str = "$bigint";

/// A value held by the cache.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum StateValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Wide(U256),
    List(Vec<StateValue>),
    Map(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Encode to the persisted text form.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json())?)
    }

    /// Decode from the persisted text form.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(value)
    }

    /// Convert to a JSON tree with wide integers tagged.
    pub fn to_json(&self) -> Value {
        match self {
            StateValue::Null => Value::Null,
            StateValue::Bool(b) => Value::Bool(*b),
            StateValue::Number(n) => Value::Number(n.clone()),
            StateValue::String(s) => Value::String(s.clone()),
            StateValue::Wide(w) => {
                let mut tagged = Map::with_capacity(1);
                tagged.insert(WIDE_INTEGER_TAG.to_string(), Value::String(w.to_string()));
                Value::Object(tagged)
            }
            StateValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            StateValue::Map(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Convert a JSON tree back, unwrapping tagged wide integers.
    ///
    /// An object whose only key is the tag and whose value is a string is
    /// always treated as a wide integer; a malformed decimal is an error.
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(match value {
            Value::Null => StateValue::Null,
            Value::Bool(b) => StateValue::Bool(b),
            Value::Number(n) => StateValue::Number(n),
            Value::String(s) => StateValue::String(s),
            Value::Array(items) => StateValue::List(
                items
                    .into_iter()
                    .map(Self::from_json)
                    .collect::<Result<_>>()?,
            ),
            Value::Object(fields) => {
                if let Some(decimal) = wide_integer_tag(&fields) {
                    let wide = U256::from_dec_str(decimal)
                        .map_err(|e| Error::InvalidWideInteger(format!("{decimal:?}: {e:?}")))?;
                    return Ok(StateValue::Wide(wide));
                }
                StateValue::Map(
                    fields
                        .into_iter()
                        .map(|(k, v)| Self::from_json(v).map(|v| (k, v)))
                        .collect::<Result<_>>()?,
                )
            }
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StateValue::Null)
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            StateValue::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_wide(&self) -> Option<U256> {
        match self {
            StateValue::Wide(w) => Some(*w),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StateValue]> {
        match self {
            StateValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a field of a map value.
    pub fn get(&self, field: &str) -> Option<&StateValue> {
        match self {
            StateValue::Map(fields) => fields.get(field),
            _ => None,
        }
    }
}

fn wide_integer_tag(fields: &Map<String, Value>) -> Option<&str> {
    if fields.len() != 1 {
        return None;
    }
    match fields.get(WIDE_INTEGER_TAG) {
        Some(Value::String(decimal)) => Some(decimal),
        _ => None,
    }
}

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(serde::de::Error::custom)
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        StateValue::Bool(b)
    }
}

impl From<u64> for StateValue {
    fn from(n: u64) -> Self {
        StateValue::Number(n.into())
    }
}

impl From<u32> for StateValue {
    fn from(n: u32) -> Self {
        StateValue::Number(n.into())
    }
}

impl From<i64> for StateValue {
    fn from(n: i64) -> Self {
        StateValue::Number(n.into())
    }
}

impl From<i32> for StateValue {
    fn from(n: i32) -> Self {
        StateValue::Number(n.into())
    }
}

impl From<f64> for StateValue {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(StateValue::Null, StateValue::Number)
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        StateValue::String(s.to_string())
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        StateValue::String(s)
    }
}

impl From<U256> for StateValue {
    fn from(w: U256) -> Self {
        StateValue::Wide(w)
    }
}

impl<T: Into<StateValue>> From<Vec<T>> for StateValue {
    fn from(items: Vec<T>) -> Self {
        StateValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, StateValue>> for StateValue {
    fn from(fields: BTreeMap<String, StateValue>) -> Self {
        StateValue::Map(fields)
    }
}

impl<T: Into<StateValue>> From<Option<T>> for StateValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(StateValue::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<StateValue>> FromIterator<(K, V)> for StateValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        StateValue::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
