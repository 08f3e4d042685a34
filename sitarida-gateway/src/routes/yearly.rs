//! Item routes for tables holding one row per entity per year.
//!
//! `GET`, `PUT` and `DELETE /<resource>/{key}/{tahun}` behave the same for
//! roads, bridges, irrigation networks and telecom coverage; a [`YearlyTable`]
//! describes what differs. `PUT` applies to the addressed year and every later
//! year of the same entity.

use axum::http::HeaderMap;
use serde_json::{json, Map, Value};
use sitarida_core::{coerce, Aksi, NumericMode, SqlValue};
use sitarida_store::{bulk, query, Criterion, Select, StoreError, YearScope};

use crate::{
    body::{audit_username, now, JsonBody},
    error::{ApiError, Context},
    routes::fields::{self, Field},
    state::AppState,
};

/// How the entity key path segment is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Positive integer, echoed as a number.
    Int,
    /// Positive BIGINT, echoed as a string.
    Big,
    /// Non-empty text.
    Text,
}

/// Accepted range of the year path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearRule {
    /// Any positive integer.
    Positive,
    /// Four digits within 1900..=3000.
    Calendar,
}

/// Per-table settings for the item routes.
#[derive(Debug, Clone, Copy)]
pub struct YearlyTable {
    /// Table written by `PUT` and `DELETE`.
    pub table: &'static str,
    /// Entity key column in `table`.
    pub key: &'static str,
    /// Name of the key in messages and in the `scope` echo.
    pub key_label: &'static str,
    /// Key segment parsing.
    pub key_kind: KeyKind,
    /// Year segment parsing.
    pub year_rule: YearRule,
    /// Columns returned by `GET`.
    pub columns: &'static str,
    /// FROM clause of `GET`; may join lookup tables.
    pub source: &'static str,
    /// Key column as qualified in `source`.
    pub key_expr: &'static str,
    /// Year column as qualified in `source`.
    pub tahun_expr: &'static str,
    /// Fields `PUT` may change.
    pub fields: &'static [Field],
    /// Columns of the first updated row echoed as `sample`, if any.
    pub sample: Option<&'static str>,
    /// Decoding for `GET`.
    pub mode: NumericMode,
    /// 500 messages for get, update and delete.
    pub fallback: [&'static str; 3],
}

impl YearlyTable {
    fn parse_key(&self, raw: &str) -> Result<SqlValue, ApiError> {
        let invalid = || ApiError::BadRequest(format!("{} tidak valid", self.key_label));
        match self.key_kind {
            KeyKind::Int | KeyKind::Big => coerce::parse_id(raw).map(SqlValue::Int).ok_or_else(invalid),
            KeyKind::Text => {
                let s = raw.trim();
                if s.is_empty() {
                    Err(invalid())
                } else {
                    Ok(SqlValue::from(s))
                }
            }
        }
    }

    fn parse_tahun(&self, raw: &str) -> Result<i64, ApiError> {
        match self.year_rule {
            YearRule::Positive => {
                coerce::parse_id(raw).ok_or_else(|| ApiError::BadRequest("tahun tidak valid".to_owned()))
            }
            YearRule::Calendar => Ok(coerce::parse_year(raw)?),
        }
    }

    fn key_json(&self, key: &SqlValue) -> Value {
        match (self.key_kind, key) {
            (KeyKind::Big, SqlValue::Int(n)) => Value::String(n.to_string()),
            _ => key.to_json(),
        }
    }

    /// Parses both path segments.
    ///
    /// # Errors
    /// Returns [`ApiError::BadRequest`] for a malformed key or year.
    pub fn parse(&self, key: &str, tahun: &str) -> Result<(SqlValue, i64), ApiError> {
        Ok((self.parse_key(key)?, self.parse_tahun(tahun)?))
    }
}

/// `GET …/{key}/{tahun}`: the single row for the pair.
///
/// # Errors
/// Returns 400 for bad segments, 404 when no row matches.
pub async fn get(state: &AppState, t: &YearlyTable, key: &str, tahun: &str) -> Result<Value, ApiError> {
    let (key, tahun) = t.parse(key, tahun)?;
    let select = Select::new(t.columns, t.source)
        .filter(Criterion::Eq(t.key_expr, key))
        .filter(Criterion::eq(t.tahun_expr, tahun));
    query::fetch_optional(&state.pool, &select, t.mode)
        .await
        .context(t.fallback[0])?
        .ok_or_else(|| ApiError::NotFound("Data tidak ditemukan".to_owned()))
}

/// `PUT …/{key}/{tahun}`: patches the pair and every later year.
///
/// # Errors
/// Returns 400 for bad segments or an empty patch, 404 when nothing is in
/// scope.
pub async fn put(
    state: &AppState,
    t: &YearlyTable,
    key: &str,
    tahun: &str,
    headers: &HeaderMap,
    body: &JsonBody,
) -> Result<Value, ApiError> {
    let (key, tahun) = t.parse(key, tahun)?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("Tidak ada field untuk diupdate".to_owned()));
    }
    let mut patch = fields::patch(&body.0, t.fields)?;
    if !patch.has_any(&fields::names(t.fields)) {
        return Err(ApiError::BadRequest("Tidak ada field data yang diupdate".to_owned()));
    }
    patch.audit(audit_username(&body.0, headers), Aksi::Edit, now());

    let scope = YearScope {
        table: t.table,
        key: t.key,
        value: key,
        tahun_gte: tahun,
    };
    let sample = t.sample.map(|cols| Select::new(cols, t.table));
    let outcome = match bulk::update_from_year(&state.pool, &scope, &patch, sample).await {
        Ok(outcome) => outcome,
        Err(StoreError::NotFound) => return Err(no_match(t)),
        Err(e) => return Err(e).context(t.fallback[1]),
    };
    tracing::info!(table = t.table, key = %scope.value, tahun_gte = tahun, updated = outcome.updated, "bulk update");

    let mut scope_json = Map::new();
    scope_json.insert(t.key_label.to_owned(), t.key_json(&scope.value));
    scope_json.insert("tahun_gte".to_owned(), json!(tahun));
    let mut out = json!({
        "ok": true,
        "updated": outcome.updated,
        "scope": scope_json,
        "applied": patch.to_json(),
    });
    if let (Some(sample), Some(obj)) = (outcome.sample, out.as_object_mut()) {
        obj.insert("sample".to_owned(), sample);
    }
    Ok(out)
}

fn no_match(t: &YearlyTable) -> ApiError {
    ApiError::NotFound(format!("Tidak ada baris yang cocok (periksa {}/tahun)", t.key_label))
}

/// `DELETE …/{key}/{tahun}`: removes the single pair.
///
/// # Errors
/// Returns 400 for bad segments, 404 when no row matches.
pub async fn delete(state: &AppState, t: &YearlyTable, key: &str, tahun: &str) -> Result<Value, ApiError> {
    let (key, tahun) = t.parse(key, tahun)?;
    let criteria = [Criterion::Eq(t.key, key), Criterion::eq("tahun", tahun)];
    let deleted = query::delete(&state.pool, t.table, &criteria)
        .await
        .context(t.fallback[2])?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Data tidak ditemukan".to_owned()));
    }
    Ok(json!({ "message": "Data berhasil dihapus", "deleted": deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: YearlyTable = YearlyTable {
        table: "tbljembatan",
        key: "jembatan_id",
        key_label: "kdjembatan",
        key_kind: KeyKind::Big,
        year_rule: YearRule::Calendar,
        columns: "*",
        source: "tbljembatan",
        key_expr: "jembatan_id",
        tahun_expr: "tahun",
        fields: &[],
        sample: None,
        mode: NumericMode::JsonSafe,
        fallback: ["a", "b", "c"],
    };

    #[test]
    fn empty_scope_names_the_key() {
        let err = no_match(&YearlyTable { key_label: "noruas", ..T });
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Tidak ada baris yang cocok (periksa noruas/tahun)"));
    }

    #[test]
    fn segments_are_validated() {
        assert!(matches!(T.parse("12", "2024"), Ok((SqlValue::Int(12), 2024))));
        assert!(T.parse("0", "2024").is_err());
        assert!(T.parse("abc", "2024").is_err());
        assert!(T.parse("12", "1899").is_err());
        assert!(T.parse("12", "20245").is_err());
    }

    #[test]
    fn big_keys_echo_as_strings() {
        assert_eq!(T.key_json(&SqlValue::Int(9_007_199_254_740_993)), json!("9007199254740993"));
        let int = YearlyTable { key_kind: KeyKind::Int, ..T };
        assert_eq!(int.key_json(&SqlValue::Int(5)), json!(5));
    }

    #[test]
    fn positive_years_accept_any_positive_number() {
        let t = YearlyTable { year_rule: YearRule::Positive, ..T };
        assert!(t.parse("1", "12").is_ok());
        assert!(t.parse("1", "-1").is_err());
    }

    #[test]
    fn text_keys_are_trimmed() {
        let t = YearlyTable { key_kind: KeyKind::Text, ..T };
        assert!(matches!(t.parse(" T01 ", "2024"), Ok((SqlValue::Text(ref s), 2024)) if s == "T01"));
        assert!(t.parse("  ", "2024").is_err());
    }
}
