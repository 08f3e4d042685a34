//! Decoding of MySQL rows into JSON objects.
//!
//! Columns are decoded by their reported type name so the same code serves
//! plain table reads, joins, and ad hoc aggregation queries whose result types
//! are chosen by the server.

use chrono::{NaiveDate, NaiveDateTime, SecondsFormat};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sitarida_core::NumericMode;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Converts one row into a JSON object keyed by column label, in select order.
#[must_use]
pub fn row_to_json(row: &MySqlRow, mode: NumericMode) -> Value {
    let mut obj = Map::with_capacity(row.len());
    for (idx, col) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, col.type_info().name(), mode);
        obj.insert(col.name().to_owned(), value);
    }
    Value::Object(obj)
}

/// Converts every row with [`row_to_json`].
#[must_use]
pub fn rows_to_json(rows: &[MySqlRow], mode: NumericMode) -> Vec<Value> {
    rows.iter().map(|r| row_to_json(r, mode)).collect()
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str, mode: NumericMode) -> Value {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(_) => return Value::Null,
    }

    let unsigned = type_name.ends_with("UNSIGNED");
    match type_name {
        "BOOLEAN" => row
            .try_get_unchecked::<bool, _>(idx)
            .map_or(Value::Null, Value::Bool),
        "BIGINT" => signed(row, idx).map_or_else(|| fallback(row, idx), |v| mode.bigint(v)),
        "BIGINT UNSIGNED" => row
            .try_get_unchecked::<u64, _>(idx)
            .map_or_else(|_| fallback(row, idx), |v| mode.ubigint(v)),
        t if is_small_int(t) && unsigned => row
            .try_get_unchecked::<u64, _>(idx)
            .map_or_else(|_| fallback(row, idx), Value::from),
        t if is_small_int(t) => signed(row, idx).map_or_else(|| fallback(row, idx), Value::from),
        "DECIMAL" => row
            .try_get_unchecked::<Decimal, _>(idx)
            .map_or_else(|_| fallback(row, idx), |d| mode.decimal(d)),
        "FLOAT" => row
            .try_get_unchecked::<f32, _>(idx)
            .ok()
            .and_then(|f| serde_json::Number::from_f64(f64::from(f)))
            .map_or(Value::Null, Value::Number),
        "DOUBLE" => row
            .try_get_unchecked::<f64, _>(idx)
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number),
        "DATETIME" | "TIMESTAMP" => row
            .try_get_unchecked::<NaiveDateTime, _>(idx)
            .map_or(Value::Null, |dt| Value::String(iso_utc(dt))),
        "DATE" => row
            .try_get_unchecked::<NaiveDate, _>(idx)
            .map_or(Value::Null, |d| Value::String(d.format("%Y-%m-%d").to_string())),
        _ => fallback(row, idx),
    }
}

fn is_small_int(type_name: &str) -> bool {
    let base = type_name.trim_end_matches(" UNSIGNED");
    matches!(base, "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "YEAR")
}

fn signed(row: &MySqlRow, idx: usize) -> Option<i64> {
    row.try_get_unchecked::<i64, _>(idx).ok()
}

/// Last resort for types without a dedicated rule: integer, then text, then bytes.
fn fallback(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(s) = row.try_get_unchecked::<String, _>(idx) {
        return Value::String(s);
    }
    if let Ok(bytes) = row.try_get_unchecked::<Vec<u8>, _>(idx) {
        return Value::String(String::from_utf8_lossy(&bytes).into_owned());
    }
    if let Some(v) = signed(row, idx) {
        return Value::from(v);
    }
    Value::Null
}

/// RFC 3339 in UTC with millisecond precision and a `Z` suffix.
#[must_use]
pub fn iso_utc(dt: NaiveDateTime) -> String {
    dt.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_int_names_are_recognised() {
        assert!(is_small_int("INT"));
        assert!(is_small_int("SMALLINT UNSIGNED"));
        assert!(is_small_int("YEAR"));
        assert!(!is_small_int("BIGINT"));
        assert!(!is_small_int("DECIMAL"));
    }

    #[test]
    fn iso_utc_renders_millis_and_zulu() {
        let dt = match NaiveDate::from_ymd_opt(2025, 1, 31).and_then(|d| d.and_hms_opt(8, 5, 9)) {
            Some(dt) => dt,
            None => panic!("valid timestamp"),
        };
        assert_eq!(iso_utc(dt), "2025-01-31T08:05:09.000Z");
    }
}
