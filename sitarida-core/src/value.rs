use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde_json::Value;

/// A typed value ready to be bound as a query parameter.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// Any integer column, including BIGINT keys.
    Int(i64),
    /// DECIMAL columns; kept exact.
    Decimal(Decimal),
    /// FLOAT / DOUBLE columns.
    Float(f64),
    /// CHAR, VARCHAR, TEXT and ENUM columns.
    Text(String),
    /// `tinyint(1)` flags.
    Bool(bool),
    /// DATETIME columns, written as naive UTC.
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// JSON echo of the value, with decimals as strings so no precision is lost.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Int(n) => Value::from(*n),
            SqlValue::Decimal(d) => Value::String(d.to_string()),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Int(n) => write!(f, "{n}"),
            SqlValue::Decimal(d) => write!(f, "{d}"),
            SqlValue::Float(x) => write!(f, "{x}"),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Bool(b) => write!(f, "{b}"),
            SqlValue::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_owned())
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn decimal_echoes_as_string() {
        let d = match Decimal::from_str("10.50") {
            Ok(d) => d,
            Err(e) => panic!("bad decimal: {e}"),
        };
        assert_eq!(SqlValue::from(d).to_json(), Value::String("10.50".to_owned()));
    }

    #[test]
    fn option_none_becomes_null() {
        let v: SqlValue = Option::<i64>::None.into();
        assert_eq!(v, SqlValue::Null);
        assert_eq!(v.to_json(), Value::Null);
    }
}
