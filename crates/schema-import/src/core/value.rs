//! Scalar values for column defaults and seed data rows.

use serde::{Deserialize, Serialize};

/// A SQL scalar value.
///
/// Used for column defaults and positional seed rows. Deserializes from
/// plain YAML/JSON scalars (untagged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Whether this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert to a SQL literal string for use in statements.
    ///
    /// Single quotes in text are doubled. Sufficient for default values and
    /// seed rows sourced from trusted descriptors; not a general-purpose
    /// quoting facility.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(v) => format!("'{}'", v.replace('\'', "''")),
        }
    }

    /// Canonical string form used by the equivalence predicate.
    ///
    /// Live schemas report defaults as strings regardless of column type, so
    /// `0`, `0.0` and `"0"` must all compare equal. `None` means "no default".
    pub fn canonical(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(v) => Some(if *v { "1" } else { "0" }.to_string()),
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => {
                if v.fract() == 0.0 {
                    Some(format!("{}", *v as i64))
                } else {
                    Some(v.to_string())
                }
            }
            Value::Text(v) => Some(v.clone()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Compare two optional defaults through their canonical forms.
pub fn defaults_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    a.and_then(Value::canonical) == b.and_then(Value::canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_literals() {
        assert_eq!(Value::Null.to_sql_literal(), "NULL");
        assert_eq!(Value::Int(42).to_sql_literal(), "42");
        assert_eq!(Value::Bool(true).to_sql_literal(), "1");
        assert_eq!(
            Value::Text("O'Brien".to_string()).to_sql_literal(),
            "'O''Brien'"
        );
    }

    #[test]
    fn test_canonical_crosses_types() {
        assert_eq!(Value::Int(0).canonical(), Value::Text("0".into()).canonical());
        assert_eq!(Value::Float(1.0).canonical(), Value::Int(1).canonical());
        assert_eq!(Value::Null.canonical(), None);
    }

    #[test]
    fn test_defaults_equal() {
        assert!(defaults_equal(Some(&Value::Int(0)), Some(&Value::Text("0".into()))));
        assert!(defaults_equal(None, Some(&Value::Null)));
        assert!(!defaults_equal(Some(&Value::Int(1)), None));
    }
}
