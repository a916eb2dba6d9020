//! Field values produced by resolution and coercion

use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved, coerced field value
///
/// Dates stay textual (ISO-8601 when parseable) because the engine is
/// locale-agnostic and fails open to the raw string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text, including dates and coercion-failed raw strings
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean from the fixed token sets
    Boolean(bool),
    /// Delimited list of values
    List(Vec<String>),
}

impl FieldValue {
    /// The raw textual form of the value
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::List(items) => items.join(", "),
        }
    }

    /// Numeric view, when the value is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_numbers_display_without_fraction() {
        assert_eq!(FieldValue::Number(1250.0).as_text(), "1250");
        assert_eq!(FieldValue::Number(12.5).as_text(), "12.5");
    }

    #[test]
    fn test_untagged_serialization() {
        assert_eq!(
            serde_json::to_string(&FieldValue::Number(3.0)).unwrap(),
            "3.0"
        );
        assert_eq!(
            serde_json::to_string(&FieldValue::Text("a".into())).unwrap(),
            r#""a""#
        );
        assert_eq!(
            serde_json::to_string(&FieldValue::Boolean(true)).unwrap(),
            "true"
        );
    }

    #[test]
    fn test_list_joins_for_display() {
        let v = FieldValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(v.to_string(), "a, b");
    }
}
