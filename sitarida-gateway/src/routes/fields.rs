//! Whitelisted body fields and their coercion into column values.

use serde_json::Value;
use sitarida_core::{coerce, Kondisi, Level, LockStatus, Patch, SqlValue};

use crate::error::ApiError;

/// How a body field is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Trimmed text of at most this many characters.
    Text(usize),
    /// Plain decimal.
    Decimal,
    /// Whole number.
    Int,
    /// Positive BIGINT identifier.
    Big,
    /// Yes/no flag.
    Flag,
    /// Four-digit year.
    Year,
    /// Bridge condition enum.
    Kondisi,
    /// Administrator level enum.
    Level,
    /// Account lock enum.
    Lock,
}

/// A whitelisted field: body key (equal to the column name) and its kind.
pub type Field = (&'static str, Kind);

/// Reads one field. Absent and blank values are `Ok(None)`.
///
/// # Errors
/// Returns [`ApiError::BadRequest`] when the value is present but invalid.
pub fn read(body: &Value, name: &str, kind: Kind) -> Result<Option<SqlValue>, ApiError> {
    let Some(raw) = coerce::field(body, name) else {
        return Ok(None);
    };
    let bad = |msg: String| Err(ApiError::BadRequest(msg));
    let value = match kind {
        Kind::Text(max) => match coerce::to_str(raw) {
            Some(s) if !coerce::fits(&s, max) => return bad(format!("{name} maksimal {max} karakter")),
            Some(s) => SqlValue::Text(s),
            None => return bad(format!("{name} harus berupa teks")),
        },
        Kind::Decimal => match coerce::to_dec(raw)? {
            Some(d) => SqlValue::Decimal(d),
            None => return Ok(None),
        },
        Kind::Int => match coerce::to_int(raw) {
            Some(n) => SqlValue::Int(n),
            None => return bad(format!("{name} harus berupa bilangan bulat")),
        },
        Kind::Big => match coerce::to_big(raw) {
            Some(n) => SqlValue::Int(n),
            None => return bad(format!("{name} wajib BigInt > 0")),
        },
        Kind::Flag => match coerce::to_flag(raw) {
            Some(b) => SqlValue::Bool(b),
            None => return bad(format!("{name} harus boolean")),
        },
        Kind::Year => match coerce::to_int(raw).filter(|y| (1000..=9999).contains(y)) {
            Some(y) => SqlValue::Int(y),
            None => return bad(format!("{name} harus 4 digit (mis. 2015)")),
        },
        Kind::Kondisi => enum_value::<Kondisi>(raw, name, Kondisi::choices(), Kondisi::as_str)?,
        Kind::Level => enum_value::<Level>(raw, name, Level::choices(), Level::as_str)?,
        Kind::Lock => enum_value::<LockStatus>(raw, name, LockStatus::choices(), LockStatus::as_str)?,
    };
    Ok(Some(value))
}

fn enum_value<E: std::str::FromStr>(
    raw: &Value,
    name: &str,
    choices: String,
    as_str: fn(E) -> &'static str,
) -> Result<SqlValue, ApiError> {
    coerce::to_str(raw)
        .and_then(|s| s.parse::<E>().ok())
        .map(|e| SqlValue::from(as_str(e)))
        .ok_or_else(|| ApiError::BadRequest(format!("{name} tidak valid. Gunakan: {choices}")))
}

/// Builds a patch from every whitelisted field present in `body`.
///
/// # Errors
/// Returns the first field error.
pub fn patch(body: &Value, fields: &[Field]) -> Result<Patch, ApiError> {
    let mut patch = Patch::new();
    for (name, kind) in fields {
        patch.set_opt(name, read(body, name, *kind)?);
    }
    Ok(patch)
}

/// Reads a required field, failing with `missing` when absent.
///
/// # Errors
/// Returns [`ApiError::BadRequest`] when absent or invalid.
pub fn required(body: &Value, name: &str, kind: Kind, missing: &str) -> Result<SqlValue, ApiError> {
    read(body, name, kind)?.ok_or_else(|| ApiError::BadRequest(missing.to_owned()))
}

/// Names of the fields, for [`Patch::has_any`].
#[must_use]
pub fn names(fields: &[Field]) -> Vec<&'static str> {
    fields.iter().map(|(n, _)| *n).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const FIELDS: &[Field] = &[
        ("nama_jembatan", Kind::Text(150)),
        ("panjang_m", Kind::Decimal),
        ("tahun_bangun", Kind::Year),
        ("kondisi", Kind::Kondisi),
        ("aktif", Kind::Flag),
    ];

    #[test]
    fn only_present_fields_reach_the_patch() {
        let body = json!({"panjang_m": "12,5", "kondisi": "baik", "ignored": 1, "nama_jembatan": ""});
        let p = match patch(&body, FIELDS) {
            Ok(p) => p,
            Err(e) => panic!("patch failed: {e}"),
        };
        assert_eq!(p.len(), 2);
        assert_eq!(p.get("kondisi"), Some(&SqlValue::from("BAIK")));
        assert!(!p.contains("nama_jembatan"));
    }

    #[test]
    fn invalid_values_name_the_field() {
        let err = match patch(&json!({"tahun_bangun": 15}), FIELDS) {
            Ok(_) => panic!("expected error"),
            Err(e) => e.to_string(),
        };
        assert_eq!(err, "tahun_bangun harus 4 digit (mis. 2015)");

        let err = match patch(&json!({"kondisi": "hancur"}), FIELDS) {
            Ok(_) => panic!("expected error"),
            Err(e) => e.to_string(),
        };
        assert!(err.starts_with("kondisi tidak valid. Gunakan: BAIK | SEDANG"));

        assert!(patch(&json!({"panjang_m": "1.2.3"}), FIELDS).is_err());
        assert!(patch(&json!({"aktif": "mungkin"}), FIELDS).is_err());
    }

    #[test]
    fn text_length_is_counted_in_characters() {
        let long = "é".repeat(150);
        assert!(read(&json!({ "nama_jembatan": long }), "nama_jembatan", Kind::Text(150)).is_ok());
        let longer = "é".repeat(151);
        assert!(read(&json!({ "nama_jembatan": longer }), "nama_jembatan", Kind::Text(150)).is_err());
    }

    #[test]
    fn required_reports_the_missing_message() {
        let err = match required(&json!({}), "kddesa", Kind::Big, "kddesa harus angka positif") {
            Ok(_) => panic!("expected error"),
            Err(e) => e.to_string(),
        };
        assert_eq!(err, "kddesa harus angka positif");
    }
}
