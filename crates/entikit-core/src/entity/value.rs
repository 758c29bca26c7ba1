//! Dynamically typed column values

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

/// A scalar bound into generated SQL
///
/// Deserializes from plain JSON scalars; `Timestamp` is only produced by
/// coercion against a timestamp column or by entities themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Append this value to `builder` as a bound parameter
    pub fn push_bind(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self.clone() {
            Self::Null => builder.push("NULL"),
            Self::Bool(v) => builder.push_bind(v),
            Self::Integer(v) => builder.push_bind(v),
            Self::Real(v) => builder.push_bind(v),
            Self::Text(v) => builder.push_bind(v),
            Self::Timestamp(v) => builder.push_bind(v),
        };
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_json_scalars() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 42, 1.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Integer(42),
                Value::Real(1.5),
                Value::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("fr")), Value::Text("fr".to_string()));
    }

    #[test]
    fn test_push_bind_uses_placeholders() {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        Value::Integer(1).push_bind(&mut builder);
        builder.push(", ");
        Value::Null.push_bind(&mut builder);
        assert_eq!(builder.sql(), "SELECT ?, NULL");
    }
}
