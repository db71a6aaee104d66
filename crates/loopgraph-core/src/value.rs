use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// State fields of a run, keyed by field name.
///
/// Ordered so that serialized state and iteration are deterministic.
pub type Fields = BTreeMap<String, Value>;

/// A single state field value.
///
/// Serialized untagged, so `{"length": 12, "chunks": ["a", "b"]}` maps onto
/// `Integer` and `List(Text, Text)` without any wrapper objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Integer or float, widened to `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// A list whose every element is text. `None` if any element is not.
    pub fn as_text_list(&self) -> Option<Vec<&str>> {
        self.as_list()?.iter().map(Value::as_text).collect()
    }

    /// Order two values for loop conditions.
    ///
    /// Numbers compare numerically (integers and floats mix freely), text
    /// compares lexicographically. Every other pairing is incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            _ => {
                let (a, b) = (self.as_number()?, other.as_number()?);
                a.partial_cmp(&b)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            other => match serde_json::to_string(other) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
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

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_untagged() {
        let fields: Fields = serde_json::from_str(
            r#"{"text": "hi", "n": 3, "f": 1.5, "list": ["a", "b"], "none": null, "flag": true}"#,
        )
        .unwrap();

        assert_eq!(fields["text"], Value::Text("hi".into()));
        assert_eq!(fields["n"], Value::Integer(3));
        assert_eq!(fields["f"], Value::Float(1.5));
        assert_eq!(fields["list"].as_text_list(), Some(vec!["a", "b"]));
        assert!(fields["none"].is_null());
        assert_eq!(fields["flag"], Value::Bool(true));
    }

    #[test]
    fn test_integers_serialize_without_fraction() {
        let json = serde_json::to_string(&Value::Integer(12)).unwrap();
        assert_eq!(json, "12");
    }

    #[test]
    fn test_accessors_are_checked() {
        let v = Value::from("text");
        assert_eq!(v.as_text(), Some("text"));
        assert_eq!(v.as_number(), None);
        assert_eq!(v.as_list(), None);

        let mixed = Value::List(vec![Value::from("a"), Value::Integer(1)]);
        assert!(mixed.as_list().is_some());
        assert_eq!(mixed.as_text_list(), None);
    }

    #[test]
    fn test_compare_numbers_and_text() {
        assert_eq!(
            Value::Integer(3).compare(&Value::Float(2.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Integer(-1).compare(&Value::Integer(0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::from("abc").compare(&Value::from("abd")),
            Some(Ordering::Less)
        );
        assert_eq!(Value::from("3").compare(&Value::Integer(3)), None);
        assert_eq!(Value::Null.compare(&Value::Integer(0)), None);
    }

    #[test]
    fn test_from_json_value() {
        let v = Value::from(serde_json::json!({"a": [1, "x"], "b": 2.5}));
        let Value::Map(map) = v else {
            panic!("expected map");
        };
        assert_eq!(
            map["a"],
            Value::List(vec![Value::Integer(1), Value::from("x")])
        );
        assert_eq!(map["b"], Value::Float(2.5));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("plain").to_string(), "plain");
        assert_eq!(Value::Integer(7).to_string(), "7");
        assert_eq!(Value::from(vec!["a"]).to_string(), r#"["a"]"#);
    }
}
