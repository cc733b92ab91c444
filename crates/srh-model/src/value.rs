//! Scalar values held in loaded tables and the keys derived from them.
//!
//! A [`Value`] is what a loaded cell contains. A [`Key`] is the non-null,
//! normalised form used for grouping, ordering and matching against values
//! written in configuration.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value. Text is parsed; unparseable text is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) if v.is_nan() => None,
            Value::Float(v) => Some(*v),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
        }
    }

    /// Text view of the value: integers and whole floats render without a
    /// decimal part.
    pub fn canonical_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) if v.is_nan() => None,
            Value::Float(v) => Some(format!("{v}")),
            Value::Text(s) => Some(s.clone()),
        }
    }

    /// Total order used for sorting records: numbers before text, nulls last.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.to_key(), other.to_key()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => match (self.as_number(), other.as_number()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.cmp(&b),
            },
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Grouping key for the value; `None` for nulls.
    pub fn to_key(&self) -> Option<Key> {
        match self {
            Value::Null => None,
            Value::Int(v) => Some(Key::Int(*v)),
            Value::Float(v) if v.is_nan() => None,
            Value::Float(v) => Some(Key::from_f64(*v)),
            Value::Text(s) => Some(Key::parse(s)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<&Key> for Value {
    fn from(key: &Key) -> Self {
        match key {
            Key::Int(v) => Value::Int(*v),
            Key::Text(s) => Value::Text(s.clone()),
        }
    }
}

/// Normalised grouping key.
///
/// Canonical integer text (`"2"`, `"-14"`, but not `"02"`) is held as
/// [`Key::Int`], so a key written as text in configuration matches numeric
/// data and vice versa. All `Int` keys sort before all `Text` keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Text(String),
}

impl Key {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(v) if v.to_string() == raw => Key::Int(v),
            _ => Key::Text(raw.to_string()),
        }
    }

    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < 9.0e15 {
            Key::Int(value as i64)
        } else {
            Key::Text(format!("{value}"))
        }
    }

    /// The blank label used for secondary index positions of a total row.
    pub fn blank() -> Self {
        Key::Text(String::new())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Key::Text(s) if s.is_empty())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Text(s) => Some(s),
            Key::Int(_) => None,
        }
    }

    /// True when the key and value denote the same category.
    pub fn matches(&self, value: &Value) -> bool {
        value.to_key().is_some_and(|key| &key == self)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{v}"),
            Key::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::parse(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::parse(&value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Key::Int(v) => serializer.serialize_i64(*v),
            Key::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyRepr {
    Int(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match KeyRepr::deserialize(deserializer)? {
            KeyRepr::Int(v) => Key::Int(v),
            KeyRepr::Float(v) => Key::from_f64(v),
            KeyRepr::Text(s) => Key::parse(&s),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_integer_text_becomes_int_key() {
        assert_eq!(Key::parse("2"), Key::Int(2));
        assert_eq!(Key::parse("-14"), Key::Int(-14));
        assert_eq!(Key::parse("02"), Key::Text("02".to_string()));
        assert_eq!(Key::parse("+5"), Key::Text("+5".to_string()));
        assert_eq!(Key::parse("16-17"), Key::Text("16-17".to_string()));
    }

    #[test]
    fn whole_floats_group_with_integers() {
        assert_eq!(Value::Float(3.0).to_key(), Some(Key::Int(3)));
        assert_eq!(Value::Float(2.5).to_key(), Some(Key::Text("2.5".to_string())));
        assert_eq!(Value::Float(f64::NAN).to_key(), None);
        assert_eq!(Value::Null.to_key(), None);
    }

    #[test]
    fn int_keys_sort_before_text_keys() {
        let mut keys = vec![Key::parse("b"), Key::Int(10), Key::parse("a"), Key::Int(9)];
        keys.sort();
        assert_eq!(
            keys,
            vec![Key::Int(9), Key::Int(10), Key::parse("a"), Key::parse("b")]
        );
    }

    #[test]
    fn key_matches_value_across_representations() {
        assert!(Key::parse("2").matches(&Value::Int(2)));
        assert!(Key::Int(2).matches(&Value::Text("2".to_string())));
        assert!(!Key::Int(2).matches(&Value::Null));
    }

    #[test]
    fn keys_deserialize_normalised() {
        let keys: Vec<Key> = serde_json::from_str(r#"["1", 2, "LARC"]"#).expect("parse keys");
        assert_eq!(keys, vec![Key::Int(1), Key::Int(2), Key::parse("LARC")]);
    }

    #[test]
    fn sort_places_nulls_last() {
        let mut values = vec![
            Value::Null,
            Value::from("E12000002"),
            Value::Float(2.5),
            Value::Int(2),
            Value::from("E12000001"),
        ];
        values.sort_by(Value::sort_cmp);
        assert_eq!(
            values,
            vec![
                Value::Int(2),
                Value::Float(2.5),
                Value::from("E12000001"),
                Value::from("E12000002"),
                Value::Null,
            ]
        );
    }

    #[test]
    fn numeric_views() {
        assert_eq!(Value::Text(" 2.5 ".to_string()).as_f64(), Some(2.5));
        assert_eq!(Value::Text("x".to_string()).as_f64(), None);
        assert_eq!(Value::Float(4.0).canonical_text().as_deref(), Some("4"));
    }
}
