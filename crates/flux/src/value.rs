//! Dynamic value type for command props and the state store.
//!
//! Values map 1:1 onto JSON (untagged serde), so command props deserialize
//! straight into them and persisted documents round-trip without a separate
//! wire representation.

use std::collections::BTreeMap;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A dynamic value carried by command props and state entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value / JSON null
    Unit,
    Bool(bool),
    /// Number (f64 with total ordering)
    Number(OrderedFloat<f64>),
    Text(Arc<str>),
    List(Vec<Value>),
    Object(BTreeMap<Arc<str>, Value>),
}

impl Value {
    pub fn number(n: f64) -> Self {
        Value::Number(OrderedFloat(n))
    }

    pub fn text(s: impl Into<Arc<str>>) -> Self {
        Value::Text(s.into())
    }

    pub fn object(fields: impl IntoIterator<Item = (impl Into<Arc<str>>, Value)>) -> Self {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.0),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<Arc<str>, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    /// Convert the value to a display string for text interpolation.
    ///
    /// Integral numbers render without a fractional part (the way the wire
    /// format writes them); lists and objects render as JSON.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Unit => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                let n = n.0;
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Text(s) => s.to_string(),
            Value::List(_) | Value::Object(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Unit,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (Arc::from(k.as_str()), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Unit => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(n.0)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.to_string()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_string_matches_wire_format() {
        assert_eq!(Value::number(3.0).to_display_string(), "3");
        assert_eq!(Value::number(3.5).to_display_string(), "3.5");
        assert_eq!(Value::text("hi").to_display_string(), "hi");
        assert_eq!(Value::Bool(true).to_display_string(), "true");
        assert_eq!(Value::Unit.to_display_string(), "");
        assert_eq!(
            Value::List(vec![Value::number(1.0), Value::text("a")]).to_display_string(),
            r#"[1.0,"a"]"#
        );
    }

    #[test]
    fn json_round_trip() {
        // Float literals: numbers always come back as f64.
        let json: serde_json::Value = serde_json::from_str(
            r#"{"text": "hi", "count": 3.5, "on": true, "items": [1.5, 2.5], "none": null}"#,
        )
        .expect("parse");
        let value = Value::from(json.clone());

        assert_eq!(value.as_object().expect("object").len(), 5);
        assert_eq!(serde_json::Value::from(&value), json);
    }

    #[test]
    fn deserializes_untagged() {
        let value: Value = serde_json::from_str("\"hello\"").expect("text");
        assert_eq!(value, Value::text("hello"));
        let value: Value = serde_json::from_str("2.5").expect("number");
        assert_eq!(value, Value::number(2.5));
        let value: Value = serde_json::from_str("null").expect("unit");
        assert!(value.is_unit());
    }
}
