//! Tables edited as whole records by numeric `id`.
//!
//! Both `POST` and `PUT` take every field; a pair of columns is unique and
//! checked before writing, with the record itself excluded on update.

use serde_json::{json, Value};
use sitarida_core::{coerce, NumericMode, Patch};
use sitarida_store::{query, Criterion, Select};

use crate::{
    error::{ApiError, Context},
    routes::{
        fields::{self, Field},
        insert_id,
    },
    state::AppState,
};

/// Per-table settings.
#[derive(Debug, Clone, Copy)]
pub struct RecordTable {
    /// Table name.
    pub table: &'static str,
    /// Columns returned by every route.
    pub columns: &'static str,
    /// Writable fields; all are required.
    pub fields: &'static [Field],
    /// Column pair that must be unique.
    pub unique: [&'static str; 2],
    /// 400 message for a clash on create.
    pub duplicate_create: &'static str,
    /// 400 message for a clash on update.
    pub duplicate_update: &'static str,
    /// 500 messages for get, create, update and delete.
    pub fallback: [&'static str; 4],
}

impl RecordTable {
    fn read_all(&self, body: &Value) -> Result<Patch, ApiError> {
        let mut patch = Patch::new();
        for (name, kind) in self.fields {
            patch.set(name, fields::required(body, name, *kind, "Semua field wajib diisi")?);
        }
        Ok(patch)
    }

    async fn clashes(&self, state: &AppState, patch: &Patch, except: Option<i64>, fallback: &'static str) -> Result<bool, ApiError> {
        let mut criteria: Vec<Criterion> = self
            .unique
            .iter()
            .filter_map(|col| patch.get(col).map(|v| Criterion::Eq(col, v.clone())))
            .collect();
        if let Some(id) = except {
            criteria.push(Criterion::ne("id", id));
        }
        query::exists(&state.pool, self.table, &criteria).await.context(fallback)
    }

    async fn by_id(&self, state: &AppState, id: i64, fallback: &'static str) -> Result<Option<Value>, ApiError> {
        let select = Select::new(self.columns, self.table).filter(Criterion::eq("id", id));
        query::fetch_optional(&state.pool, &select, NumericMode::JsonSafe)
            .await
            .context(fallback)
    }
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    coerce::parse_id(raw).ok_or_else(|| ApiError::NotFound("Data tidak ditemukan".to_owned()))
}

/// Every row.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list(state: &AppState, t: &RecordTable) -> Result<Vec<Value>, ApiError> {
    let select = Select::new(t.columns, t.table).order_by("id ASC");
    query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(t.fallback[0])
}

/// Inserts a full record.
///
/// # Errors
/// Returns 400 for a missing field or a clash on the unique pair.
pub async fn create(state: &AppState, t: &RecordTable, body: &Value) -> Result<Value, ApiError> {
    let patch = t.read_all(body)?;
    if t.clashes(state, &patch, None, t.fallback[1]).await? {
        return Err(ApiError::BadRequest(t.duplicate_create.to_owned()));
    }
    let id = match query::insert(&state.pool, t.table, &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => return Err(ApiError::BadRequest(t.duplicate_create.to_owned())),
        Err(e) => return Err(e).context(t.fallback[1]),
    };
    tracing::info!(table = t.table, id, "record created");
    t.by_id(state, id, t.fallback[1])
        .await?
        .ok_or_else(|| ApiError::Internal(format!("row {id} vanished after insert")))
}

/// One record.
///
/// # Errors
/// Returns 404 when missing.
pub async fn get(state: &AppState, t: &RecordTable, id: &str) -> Result<Value, ApiError> {
    let id = parse_id(id)?;
    t.by_id(state, id, t.fallback[0])
        .await?
        .ok_or_else(|| ApiError::NotFound("Data tidak ditemukan".to_owned()))
}

/// Replaces a record.
///
/// # Errors
/// Returns 400 for a missing field or a clash with another record, 404 when
/// missing.
pub async fn update(state: &AppState, t: &RecordTable, id: &str, body: &Value) -> Result<Value, ApiError> {
    let id = parse_id(id)?;
    let patch = t.read_all(body)?;
    if t.clashes(state, &patch, Some(id), t.fallback[2]).await? {
        return Err(ApiError::BadRequest(t.duplicate_update.to_owned()));
    }
    if t.by_id(state, id, t.fallback[2]).await?.is_none() {
        return Err(ApiError::NotFound("Data tidak ditemukan".to_owned()));
    }
    match query::update(&state.pool, t.table, &patch, &[Criterion::eq("id", id)]).await {
        Ok(_) => {}
        Err(e) if e.is_conflict() => return Err(ApiError::BadRequest(t.duplicate_update.to_owned())),
        Err(e) => return Err(e).context(t.fallback[2]),
    }
    t.by_id(state, id, t.fallback[2])
        .await?
        .ok_or_else(|| ApiError::NotFound("Data tidak ditemukan".to_owned()))
}

/// Deletes a record and echoes it.
///
/// # Errors
/// Returns 404 when missing.
pub async fn delete(state: &AppState, t: &RecordTable, id: &str) -> Result<Value, ApiError> {
    let id = parse_id(id)?;
    let Some(row) = t.by_id(state, id, t.fallback[3]).await? else {
        return Err(ApiError::NotFound("Data tidak ditemukan".to_owned()));
    };
    query::delete(&state.pool, t.table, &[Criterion::eq("id", id)])
        .await
        .context(t.fallback[3])?;
    Ok(json!({ "message": "Data berhasil dihapus", "data": row }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sitarida_core::SqlValue;

    use super::*;
    use crate::routes::fields::Kind;

    const T: RecordTable = RecordTable {
        table: "tbldayalistrik",
        columns: "*",
        fields: &[
            ("nmkecamatan", Kind::Text(100)),
            ("tahun", Kind::Int),
            ("dayatersedia", Kind::Decimal),
        ],
        unique: ["nmkecamatan", "tahun"],
        duplicate_create: "dup",
        duplicate_update: "dup",
        fallback: ["a", "b", "c", "d"],
    };

    #[test]
    fn every_field_is_required() {
        let err = match T.read_all(&json!({"nmkecamatan": "AEK", "tahun": 2024})) {
            Ok(_) => panic!("expected error"),
            Err(e) => e.to_string(),
        };
        assert_eq!(err, "Semua field wajib diisi");
    }

    #[test]
    fn full_body_becomes_a_patch() {
        let p = match T.read_all(&json!({"nmkecamatan": " AEK ", "tahun": "2024", "dayatersedia": "1,5"})) {
            Ok(p) => p,
            Err(e) => panic!("read failed: {e}"),
        };
        assert_eq!(p.get("nmkecamatan"), Some(&SqlValue::from("AEK")));
        assert_eq!(p.get("tahun"), Some(&SqlValue::Int(2024)));
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn non_numeric_ids_are_not_found() {
        assert!(matches!(parse_id("abc"), Err(ApiError::NotFound(_))));
        assert!(matches!(parse_id("7"), Ok(7)));
    }
}
