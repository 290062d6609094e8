use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Result, SqlFetchError};

/// Represents a SQL value in a driver-agnostic way, both as a bound
/// parameter and as a fetched column value.
/// Drivers are responsible for converting these to their native types.
///
/// Floats compare and hash by bit pattern so that any value can key an
/// assoc or pairs result.
#[derive(Debug, Clone)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Text(String),
    /// A sequence of scalars, expanded into one placeholder per element
    /// when bound (for `IN (...)` predicates).
    List(Vec<SqlValue>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int32(i) => Some(i64::from(*i)),
            SqlValue::Int64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int32(_) => "int32",
            SqlValue::Int64(_) => "int64",
            SqlValue::Float64(_) => "float64",
            SqlValue::Text(_) => "text",
            SqlValue::List(_) => "list",
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SqlValue::Null, SqlValue::Null) => true,
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a == b,
            (SqlValue::Int32(a), SqlValue::Int32(b)) => a == b,
            (SqlValue::Int64(a), SqlValue::Int64(b)) => a == b,
            (SqlValue::Float64(a), SqlValue::Float64(b)) => a.to_bits() == b.to_bits(),
            (SqlValue::Text(a), SqlValue::Text(b)) => a == b,
            (SqlValue::List(a), SqlValue::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for SqlValue {}

impl Hash for SqlValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            SqlValue::Null => {}
            SqlValue::Bool(b) => b.hash(state),
            SqlValue::Int32(i) => i.hash(state),
            SqlValue::Int64(i) => i.hash(state),
            SqlValue::Float64(f) => f.to_bits().hash(state),
            SqlValue::Text(s) => s.hash(state),
            SqlValue::List(items) => items.hash(state),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int32(i) => write!(f, "{}", i),
            SqlValue::Int64(i) => write!(f, "{}", i),
            SqlValue::Float64(v) => write!(f, "{}", v),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float64(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(values: Vec<T>) -> Self {
        SqlValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

/// Conversion from a fetched column value into a Rust type.
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: SqlValue) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &SqlValue) -> Result<T> {
    Err(SqlFetchError::ShapeConstruction(format!(
        "expected {}, got {} value {}",
        expected,
        value.type_name(),
        value
    )))
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        Ok(value)
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value.as_i64() {
            Some(i) => Ok(i),
            None => mismatch("integer", &value),
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Int32(i) => Ok(i),
            SqlValue::Int64(i) => match i32::try_from(i) {
                Ok(i) => Ok(i),
                Err(_) => mismatch("32-bit integer", &value),
            },
            other => mismatch("32-bit integer", &other),
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Float64(v) => Ok(v),
            SqlValue::Int32(i) => Ok(f64::from(i)),
            other => mismatch("float", &other),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            other => mismatch("bool", &other),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Text(s) => Ok(s),
            other => mismatch("text", &other),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_float_values_can_key_a_map() {
        let mut map = HashMap::new();
        map.insert(SqlValue::Float64(1.5), "a");
        map.insert(SqlValue::Float64(1.5), "b");
        map.insert(SqlValue::Int64(1), "c");

        assert_eq!(map.len(), 2);
        assert_eq!(map[&SqlValue::Float64(1.5)], "b");
    }

    #[test]
    fn test_int_widths_are_distinct_values() {
        assert_ne!(SqlValue::Int32(1), SqlValue::Int64(1));
        assert_eq!(SqlValue::Int32(1).as_i64(), SqlValue::Int64(1).as_i64());
    }

    #[test]
    fn test_list_from_vec() {
        let value = SqlValue::from(vec![1i64, 2, 3]);
        assert_eq!(
            value,
            SqlValue::List(vec![
                SqlValue::Int64(1),
                SqlValue::Int64(2),
                SqlValue::Int64(3)
            ])
        );
        assert_eq!(value.to_string(), "1, 2, 3");
    }

    #[test]
    fn test_from_sql_value_conversions() {
        assert_eq!(i64::from_sql_value(SqlValue::Int32(4)).unwrap(), 4);
        assert_eq!(
            Option::<String>::from_sql_value(SqlValue::Null).unwrap(),
            None
        );
        assert!(matches!(
            bool::from_sql_value(SqlValue::Text("yes".into())),
            Err(SqlFetchError::ShapeConstruction(_))
        ));
        assert!(i32::from_sql_value(SqlValue::Int64(i64::MAX)).is_err());
    }
}
