//! Loose-to-strict coercion of request values.
//!
//! Request bodies arrive from spreadsheets and form builders, so numbers are
//! often strings, decimals may use a comma separator, and empty strings stand
//! in for "not provided". Every helper here treats `null`, a missing value and
//! `""` the same way: as absent.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::CoreError;

/// Lowest year accepted in path parameters.
pub const MIN_YEAR: i64 = 1900;
/// Highest year accepted in path parameters.
pub const MAX_YEAR: i64 = 3000;

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Reads an optional value from a JSON object, treating blanks as absent.
#[must_use]
pub fn field<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get(key).filter(|v| !is_blank(v))
}

/// Number or numeric string as `f64`. Non-finite results are rejected.
#[must_use]
pub fn to_num(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Whole number, either a JSON integer, an integral float, or an integer string.
#[must_use]
pub fn to_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            float_to_int(f)
        }),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_int(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}

/// Like [`to_int`] but distinguishes "absent" from "present and invalid".
///
/// # Errors
/// Returns [`CoreError::InvalidInteger`] when the value is present but not a
/// whole number.
pub fn opt_int(body: &Value, key: &str) -> Result<Option<i64>, CoreError> {
    match field(body, key) {
        None => Ok(None),
        Some(v) => to_int(v).map(Some).ok_or_else(|| CoreError::InvalidInteger {
            field: key.to_owned(),
        }),
    }
}

/// Positive identifier for BIGINT key columns.
#[must_use]
pub fn to_big(v: &Value) -> Option<i64> {
    let s = match v {
        Value::Number(n) => return n.as_i64().filter(|n| *n > 0),
        Value::String(s) => s.trim(),
        _ => return None,
    };
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>().ok().filter(|n| *n > 0)
}

/// Plain decimal in `-?\d+(\.\d+)?` form; a single `,` is read as the separator.
///
/// Returns `Ok(None)` for blank input.
///
/// # Errors
/// Returns [`CoreError::InvalidDecimal`] when the text is not a plain decimal.
pub fn to_dec(v: &Value) -> Result<Option<Decimal>, CoreError> {
    let raw = match v {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };
    let s = raw.replacen(',', ".", 1);
    let s = s.trim();
    if !is_plain_decimal(s) {
        return Err(CoreError::InvalidDecimal { raw });
    }
    Decimal::from_str(s)
        .map(Some)
        .map_err(|_| CoreError::InvalidDecimal { raw })
}

/// Reads `key` from `body` through [`to_dec`].
///
/// # Errors
/// Propagates [`CoreError::InvalidDecimal`].
pub fn opt_dec(body: &Value, key: &str) -> Result<Option<Decimal>, CoreError> {
    body.get(key).map_or(Ok(None), to_dec)
}

fn is_plain_decimal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let (int, frac) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.is_none_or(digits)
}

/// Trimmed text; blanks are absent and scalars are stringified.
#[must_use]
pub fn to_str(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Reads `key` from `body` through [`to_str`].
#[must_use]
pub fn opt_str(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(to_str)
}

/// Yes/no flags as stored in the `verif` and `aktif` columns.
#[must_use]
pub fn to_flag(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "ya" | "y" => Some(true),
            "0" | "false" | "tidak" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parses a path or query year: four digits within [`MIN_YEAR`]..=[`MAX_YEAR`].
///
/// # Errors
/// Returns [`CoreError::InvalidYear`] otherwise.
pub fn parse_year(raw: &str) -> Result<i64, CoreError> {
    let s = raw.trim();
    let invalid = || CoreError::InvalidYear { raw: raw.to_owned() };
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year = s.parse::<i64>().map_err(|_| invalid())?;
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(year)
    } else {
        Err(invalid())
    }
}

/// Parses a positive integer path segment.
#[must_use]
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|n| *n > 0)
}

/// `true` when `s` has at most `max` characters.
#[must_use]
pub fn fits(s: &str, max: usize) -> bool {
    s.chars().count() <= max
}

/// Clamps a `?limit=` value to `1..=max`, falling back to `default`.
#[must_use]
pub fn clamp_limit(raw: Option<&str>, default: i64, max: i64) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map_or(default, |n| n.min(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_dec_accepts_comma_separator() {
        let d = match to_dec(&json!("12,5")) {
            Ok(Some(d)) => d,
            other => panic!("expected decimal, got {other:?}"),
        };
        assert_eq!(d.to_string(), "12.5");
    }

    #[test]
    fn to_dec_blank_is_absent() {
        assert_eq!(to_dec(&json!("")), Ok(None));
        assert_eq!(to_dec(&Value::Null), Ok(None));
    }

    #[test]
    fn to_dec_rejects_exponent_and_garbage() {
        for raw in ["1e5", "abc", "1.", ".5", "--1", "1.2.3"] {
            assert!(to_dec(&json!(raw)).is_err(), "{raw} must be rejected");
        }
    }

    #[test]
    fn to_dec_error_message_names_the_value() {
        let err = match to_dec(&json!("x1")) {
            Err(e) => e,
            Ok(v) => panic!("expected error, got {v:?}"),
        };
        assert_eq!(err.to_string(), "Nilai desimal tidak valid: x1");
    }

    #[test]
    fn to_int_reads_strings_and_integral_floats() {
        assert_eq!(to_int(&json!(" 42 ")), Some(42));
        assert_eq!(to_int(&json!(7.0)), Some(7));
        assert_eq!(to_int(&json!(7.5)), None);
        assert_eq!(to_int(&json!("")), None);
        assert_eq!(to_int(&json!(true)), None);
    }

    #[test]
    fn opt_int_distinguishes_absent_from_invalid() {
        let body = json!({"a": "", "b": "x", "c": 3});
        assert_eq!(opt_int(&body, "a"), Ok(None));
        assert!(opt_int(&body, "b").is_err());
        assert_eq!(opt_int(&body, "c"), Ok(Some(3)));
        assert_eq!(opt_int(&body, "missing"), Ok(None));
    }

    #[test]
    fn to_big_requires_positive_digits() {
        assert_eq!(to_big(&json!("1203")), Some(1203));
        assert_eq!(to_big(&json!(0)), None);
        assert_eq!(to_big(&json!("-5")), None);
        assert_eq!(to_big(&json!("12a")), None);
    }

    #[test]
    fn to_str_trims_and_drops_blank() {
        assert_eq!(to_str(&json!("  Batang Angkola ")), Some("Batang Angkola".to_owned()));
        assert_eq!(to_str(&json!("   ")), None);
        assert_eq!(to_str(&json!(12)), Some("12".to_owned()));
    }

    #[test]
    fn to_flag_understands_common_spellings() {
        assert_eq!(to_flag(&json!(1)), Some(true));
        assert_eq!(to_flag(&json!("TRUE")), Some(true));
        assert_eq!(to_flag(&json!("0")), Some(false));
        assert_eq!(to_flag(&json!("maybe")), None);
    }

    #[test]
    fn parse_year_bounds() {
        assert_eq!(parse_year("2024"), Ok(2024));
        assert!(parse_year("1899").is_err());
        assert!(parse_year("3001").is_err());
        assert!(parse_year("24").is_err());
        assert!(parse_year("20x4").is_err());
    }

    #[test]
    fn clamp_limit_applies_default_and_cap() {
        assert_eq!(clamp_limit(None, 1000, 5000), 1000);
        assert_eq!(clamp_limit(Some("20"), 1000, 5000), 20);
        assert_eq!(clamp_limit(Some("99999"), 1000, 5000), 5000);
        assert_eq!(clamp_limit(Some("-3"), 1000, 5000), 1000);
    }

    #[test]
    fn fits_counts_characters_not_bytes() {
        assert!(fits("Sipirok é", 9));
        assert!(!fits("abcdef", 5));
    }

    proptest::proptest! {
        #[test]
        fn proptest_to_dec_accepts_every_plain_decimal(
            int in 0u64..10_000_000,
            frac in 0u32..10_000,
            neg in proptest::prelude::any::<bool>(),
        ) {
            let text = format!("{}{int}.{frac}", if neg { "-" } else { "" });
            let parsed = to_dec(&json!(text));
            proptest::prop_assert!(matches!(parsed, Ok(Some(_))), "{text} rejected");
        }

        #[test]
        fn proptest_to_int_round_trips_integers(n in proptest::prelude::any::<i32>()) {
            proptest::prop_assert_eq!(to_int(&json!(n.to_string())), Some(i64::from(n)));
            proptest::prop_assert_eq!(to_int(&json!(n)), Some(i64::from(n)));
        }

        #[test]
        fn proptest_to_dec_never_panics(s in ".{0,40}") {
            let _ = to_dec(&json!(s));
        }
    }
}
