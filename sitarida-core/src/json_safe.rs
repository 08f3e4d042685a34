//! Rendering of wide numeric types into JSON.
//!
//! BIGINT and DECIMAL values cannot always survive a round trip through an
//! IEEE-754 double on the client, so most endpoints send them as strings.
//! Aggregation endpoints feed charts and want plain numbers instead.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

/// How BIGINT and DECIMAL columns are written to JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumericMode {
    /// BIGINT and DECIMAL as strings.
    #[default]
    JsonSafe,
    /// BIGINT as number, DECIMAL as string.
    Raw,
    /// Both as numbers.
    Numbers,
}

impl NumericMode {
    /// JSON form of a BIGINT value.
    #[must_use]
    pub fn bigint(self, v: i64) -> Value {
        match self {
            NumericMode::JsonSafe => Value::String(v.to_string()),
            NumericMode::Raw | NumericMode::Numbers => Value::from(v),
        }
    }

    /// JSON form of an unsigned BIGINT value.
    #[must_use]
    pub fn ubigint(self, v: u64) -> Value {
        match self {
            NumericMode::JsonSafe => Value::String(v.to_string()),
            NumericMode::Raw | NumericMode::Numbers => Value::from(v),
        }
    }

    /// JSON form of a DECIMAL value.
    #[must_use]
    pub fn decimal(self, v: Decimal) -> Value {
        match self {
            NumericMode::JsonSafe | NumericMode::Raw => Value::String(v.normalize().to_string()),
            NumericMode::Numbers => decimal_number(v),
        }
    }
}

/// DECIMAL as a JSON number, `null` if it does not fit an `f64`.
#[must_use]
pub fn decimal_number(v: Decimal) -> Value {
    v.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// Coerces a rendered JSON value into a number where possible.
///
/// Strings holding numbers become numbers (integers stay integers);
/// everything else is returned as is.
#[must_use]
pub fn numberish(v: Value) -> Value {
    if let Value::String(s) = &v {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Value::from(n);
        }
        if let Some(n) = s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return Value::Number(n);
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        match Decimal::from_str(s) {
            Ok(d) => d,
            Err(e) => panic!("bad decimal {s}: {e}"),
        }
    }

    #[test]
    fn json_safe_stringifies_bigint_and_decimal() {
        let mode = NumericMode::JsonSafe;
        assert_eq!(mode.bigint(9_007_199_254_740_993), Value::String("9007199254740993".to_owned()));
        assert_eq!(mode.decimal(dec("12.50")), Value::String("12.5".to_owned()));
    }

    #[test]
    fn raw_mode_keeps_bigint_numeric() {
        assert_eq!(NumericMode::Raw.bigint(42), Value::from(42));
        assert!(NumericMode::Raw.decimal(dec("1.5")).is_string());
    }

    #[test]
    fn numbers_mode_converts_decimal() {
        assert_eq!(NumericMode::Numbers.decimal(dec("80.25")), serde_json::json!(80.25));
    }

    #[test]
    fn numberish_parses_numeric_strings_only() {
        assert_eq!(numberish(Value::String("3.5".to_owned())), serde_json::json!(3.5));
        assert_eq!(numberish(Value::String("2024".to_owned())), serde_json::json!(2024));
        assert_eq!(numberish(Value::String("n/a".to_owned())), Value::String("n/a".to_owned()));
        assert_eq!(numberish(Value::Null), Value::Null);
    }
}
