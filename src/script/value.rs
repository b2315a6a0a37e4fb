//! Values crossing the script/host boundary

use std::collections::BTreeMap;

/// Dynamically typed value as seen by scripts
///
/// Host data is always converted into one of these variants before a
/// script sees it; absent data is `Nil`, never an empty string or zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScriptValue {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Sequence(Vec<ScriptValue>),
    Map(BTreeMap<String, ScriptValue>),
}

impl ScriptValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Sequence(_) => "sequence",
            ScriptValue::Map(_) => "map",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    /// Only `nil` and `false` are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, ScriptValue::Nil | ScriptValue::Bool(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ScriptValue]> {
        match self {
            ScriptValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ScriptValue>> {
        match self {
            ScriptValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Field of a map value
    pub fn get(&self, key: &str) -> Option<&ScriptValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Convert to JSON. Non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScriptValue::Nil => serde_json::Value::Null,
            ScriptValue::Bool(b) => serde_json::Value::Bool(*b),
            ScriptValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            ScriptValue::String(s) => serde_json::Value::String(s.clone()),
            ScriptValue::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(ScriptValue::to_json).collect())
            }
            ScriptValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<i64> for ScriptValue {
    fn from(value: i64) -> Self {
        ScriptValue::Number(value as f64)
    }
}

impl From<u64> for ScriptValue {
    fn from(value: u64) -> Self {
        ScriptValue::Number(value as f64)
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Number(f64::from(value))
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(value)
    }
}

impl<T: Into<ScriptValue>> From<Option<T>> for ScriptValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ScriptValue::Nil)
    }
}

impl<T: Into<ScriptValue>> From<Vec<T>> for ScriptValue {
    fn from(items: Vec<T>) -> Self {
        ScriptValue::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ScriptValue>> for ScriptValue {
    fn from(map: BTreeMap<String, ScriptValue>) -> Self {
        ScriptValue::Map(map)
    }
}

impl From<serde_json::Value> for ScriptValue {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => ScriptValue::Nil,
            serde_json::Value::Bool(b) => ScriptValue::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(ScriptValue::Number).unwrap_or_default(),
            serde_json::Value::String(s) => ScriptValue::String(s),
            serde_json::Value::Array(items) => {
                ScriptValue::Sequence(items.into_iter().map(ScriptValue::from).collect())
            }
            serde_json::Value::Object(map) => ScriptValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ScriptValue::from(v)))
                    .collect(),
            ),
        }
    }
}
