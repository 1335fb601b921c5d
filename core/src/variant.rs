//! Runtime value type
//!
//! The interpreter core only needs a small slice of the variant model:
//! construction, keyed get/set/remove on objects, iteration and equality.
//! Objects keep their keys sorted.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Runtime value type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    #[default]
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Val>),
    Obj(BTreeMap<String, Val>),
}

impl Val {
    /// Make an empty object
    pub fn object() -> Self {
        Val::Obj(BTreeMap::new())
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Bool(b) => *b,
            Val::Null => false,
            _ => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Val::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "boolean",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::List(_) => "array",
            Val::Obj(_) => "object",
        }
    }

    /// Get a property of an object value
    pub fn get(&self, key: &str) -> Option<&Val> {
        match self {
            Val::Obj(map) => map.get(key),
            _ => None,
        }
    }

    /// Set a property on an object value
    ///
    /// Returns false when the value is not an object.
    pub fn set(&mut self, key: impl Into<String>, value: Val) -> bool {
        match self {
            Val::Obj(map) => {
                map.insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Remove a property from an object value
    pub fn remove(&mut self, key: &str) -> Option<Val> {
        match self {
            Val::Obj(map) => map.remove(key),
            _ => None,
        }
    }

    /// Iterate over the entries of an object in key order
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Val)> {
        let map = match self {
            Val::Obj(map) => Some(map),
            _ => None,
        };
        map.into_iter().flat_map(|m| m.iter())
    }

    /// Stringify a value the way attribute concatenation does
    pub fn to_display_string(&self) -> String {
        match self {
            Val::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null => write!(f, "null"),
            Val::Bool(b) => write!(f, "{}", b),
            Val::Num(n) if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Val::Num(n) => write!(f, "{}", n),
            Val::Str(s) => write!(f, "{:?}", s),
            Val::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Val::Obj(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::Str(s)
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Num(n)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

/* ===================== JSON Conversion ===================== */

impl From<&JsonValue> for Val {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Val::Null,
            JsonValue::Bool(b) => Val::Bool(*b),
            JsonValue::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Val::Str(s.clone()),
            JsonValue::Array(items) => Val::List(items.iter().map(Val::from).collect()),
            JsonValue::Object(map) => Val::Obj(
                map.iter()
                    .map(|(k, v)| (k.clone(), Val::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Val> for JsonValue {
    fn from(val: &Val) -> Self {
        match val {
            Val::Null => JsonValue::Null,
            Val::Bool(b) => JsonValue::Bool(*b),
            Val::Num(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => JsonValue::from(*n as i64),
            Val::Num(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Val::Str(s) => JsonValue::String(s.clone()),
            Val::List(items) => JsonValue::Array(items.iter().map(JsonValue::from).collect()),
            Val::Obj(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), JsonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_get_set_remove() {
        let mut obj = Val::object();
        assert!(obj.set("b", Val::Num(2.0)));
        assert!(obj.set("a", Val::Num(1.0)));
        assert_eq!(obj.get("a"), Some(&Val::Num(1.0)));

        let keys: Vec<&String> = obj.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);

        assert_eq!(obj.remove("a"), Some(Val::Num(1.0)));
        assert_eq!(obj.get("a"), None);

        let mut not_obj = Val::Num(1.0);
        assert!(!not_obj.set("a", Val::Null));
    }

    #[test]
    fn test_json_conversion() {
        let json = json!({"name": "x", "items": [1, true, null]});
        let val = Val::from(&json);
        assert_eq!(
            val.get("items"),
            Some(&Val::List(vec![Val::Num(1.0), Val::Bool(true), Val::Null]))
        );
        assert_eq!(JsonValue::from(&val), json);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Val::Num(3.0).to_display_string(), "3");
        assert_eq!(Val::Num(2.5).to_display_string(), "2.5");
        assert_eq!(Val::from("hi").to_display_string(), "hi");
        assert_eq!(Val::Null.to_display_string(), "null");
    }
}
