//! Villages (`refdesa`). Public.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use sitarida_core::{coerce, NumericMode, Patch};
use sitarida_store::{query, Criterion, Select};

use super::{found, kecamatan::SearchQuery, key, Target};
use crate::{
    body::JsonBody,
    error::{ApiError, Context},
    routes::{
        fields::{self, Kind},
        insert_id, trimmed,
    },
    state::AppState,
};

const COLUMNS: &str = "id, kddesa, nmdesa";
const TABLE: &str = "refdesa";
const INVALID_ID: &str = "Invalid ID: must be a positive integer";
const DUPLICATE: &str = "Data duplikat (nilai unik sudah digunakan)";

fn missing(id: i64) -> String {
    format!("Desa dengan ID {id} tidak ditemukan")
}

/// `GET /api/ref-desa` — `?search` matches the code exactly when numeric, or the name.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Result<Json<Value>, ApiError> {
    let search = trimmed(q.search.as_ref()).map(|s| {
        let mut any = vec![Criterion::contains("nmdesa", s)];
        if let Ok(n) = s.parse::<i64>() {
            any.insert(0, Criterion::eq("kddesa", n));
        }
        Criterion::Any(any)
    });
    let select = Select::new(COLUMNS, TABLE).filter_opt(search).order_by("kddesa DESC");
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context("Failed to fetch desa")?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/ref-desa`
///
/// # Errors
/// Returns 400 for a missing name or non-positive code, 409 on a duplicate.
pub async fn create(State(state): State<AppState>, JsonBody(b): JsonBody) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FALLBACK: &str = "Gagal menambahkan desa";
    let Some(nmdesa) = b.get("nmdesa").and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(ApiError::BadRequest("Body tidak valid. Wajib { kddesa, nmdesa }".to_owned()));
    };
    let kddesa = fields::required(&b, "kddesa", Kind::Big, "kddesa harus angka positif")
        .map_err(|_| ApiError::BadRequest("kddesa harus angka positif".to_owned()))?;

    let mut patch = Patch::new();
    patch.set("kddesa", kddesa).set("nmdesa", nmdesa);
    let id = match query::insert(&state.pool, TABLE, &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => return Err(ApiError::Conflict(DUPLICATE.to_owned())),
        Err(e) => return Err(e).context(FALLBACK),
    };
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("id", id));
    let row = found(&state, &select, missing(id), FALLBACK).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/ref-desa/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn get_item(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = key(&id, INVALID_ID)?;
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("id", id));
    found(&state, &select, missing(id), "Terjadi kesalahan internal").await.map(Json)
}

/// `PUT /api/ref-desa/{id}` — partial update of code and name.
///
/// # Errors
/// Returns 400 for bad input, 404 when missing, 409 on a duplicate.
pub async fn put_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(b): JsonBody,
) -> Result<Json<Value>, ApiError> {
    const FALLBACK: &str = "Gagal memperbarui data desa";
    let id = key(&id, INVALID_ID)?;
    let patch = fields::patch(&b, &[("kddesa", Kind::Big), ("nmdesa", Kind::Text(255))])?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("Tidak ada field untuk diupdate".to_owned()));
    }
    Target { table: TABLE, key: "id", id, fallback: FALLBACK }
        .patch(&state, &patch, &missing(id), DUPLICATE)
        .await?;
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("id", id));
    found(&state, &select, missing(id), FALLBACK).await.map(Json)
}

/// `DELETE /api/ref-desa/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn delete_item(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = key(&id, INVALID_ID)?;
    Target { table: TABLE, key: "id", id, fallback: "Gagal menghapus data desa" }
        .remove(&state, "Desa tidak ditemukan")
        .await?;
    Ok(Json(json!({ "message": "Data desa berhasil dihapus", "ok": true })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testkit::{send, send_json};

    #[tokio::test]
    async fn create_validates_the_body_shape() {
        let (status, body) = send_json(Method::POST, "/api/ref-desa", None, json!({"kddesa": 5})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Body tidak valid. Wajib { kddesa, nmdesa }");

        let (_, body) = send_json(Method::POST, "/api/ref-desa", None, json!({"kddesa": -5, "nmdesa": "X"})).await;
        assert_eq!(body["error"], "kddesa harus angka positif");
    }

    #[tokio::test]
    async fn bad_ids_are_rejected_before_querying() {
        let (status, body) = send(Method::GET, "/api/ref-desa/1.5", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid ID: must be a positive integer");
    }
}
