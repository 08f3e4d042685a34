//! Districts (`refkecamatan`), also served publicly under `/tblperkapita`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sitarida_core::{coerce, NumericMode, Patch};
use sitarida_store::{query, Criterion, Select};

use super::{found, key, Target};
use crate::{
    auth::AnyKey,
    body::JsonBody,
    error::{ApiError, Context},
    routes::{insert_id, trimmed},
    state::AppState,
};

const COLUMNS: &str = "id, kddesa, kdkecamatan, nmkecamatan";
const TABLE: &str = "refkecamatan";

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

async fn search(state: &AppState, q: &SearchQuery) -> Result<Json<Value>, ApiError> {
    let select = Select::new(COLUMNS, TABLE)
        .filter_opt(trimmed(q.search.as_ref()).map(|s| Criterion::contains("nmkecamatan", s)))
        .order_by("kdkecamatan DESC");
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context("Failed to fetch kecamatan")?;
    Ok(Json(Value::Array(rows)))
}

async fn insert(state: &AppState, b: &Value) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FALLBACK: &str = "Gagal menambahkan kecamatan";
    let kddesa = coerce::field(b, "kddesa").and_then(coerce::to_int).filter(|n| *n != 0);
    let kdkecamatan = coerce::field(b, "kdkecamatan").and_then(coerce::to_int).filter(|n| *n != 0);
    let nmkecamatan = coerce::opt_str(b, "nmkecamatan");
    let (Some(kddesa), Some(kdkecamatan), Some(nmkecamatan)) = (kddesa, kdkecamatan, nmkecamatan) else {
        return Err(ApiError::BadRequest(
            "kddesa, kdkecamatan, dan nmkecamatan wajib diisi".to_owned(),
        ));
    };
    let mut patch = Patch::new();
    patch
        .set("kddesa", kddesa)
        .set("kdkecamatan", kdkecamatan)
        .set("nmkecamatan", nmkecamatan);
    let id = match query::insert(&state.pool, TABLE, &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => return Err(ApiError::Conflict("kecamatan already exists".to_owned())),
        Err(e) => return Err(e).context(FALLBACK),
    };
    tracing::info!(id, kdkecamatan, "district created");
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("id", id));
    let row = found(state, &select, "Not found".to_owned(), FALLBACK).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/ref-kecamatan` — districts, newest code first; `?search` matches the name.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list(_: AnyKey, State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Result<Json<Value>, ApiError> {
    search(&state, &q).await
}

/// `POST /api/ref-kecamatan`
///
/// # Errors
/// Returns 400 when a field is missing, 409 on a duplicate.
pub async fn create(
    _: AnyKey,
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    insert(&state, &b).await
}

/// `GET /api/tblperkapita` — the district list without a key.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list_public(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Result<Json<Value>, ApiError> {
    search(&state, &q).await
}

/// `POST /api/tblperkapita`
///
/// # Errors
/// Returns 400 when a field is missing, 409 on a duplicate.
pub async fn create_public(
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    insert(&state, &b).await
}

/// `GET /api/ref-kecamatan/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn get_item(_: AnyKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = key(&id, "Invalid id")?;
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("id", id));
    found(&state, &select, "Not found".to_owned(), "Failed to fetch kecamatan")
        .await
        .map(Json)
}

/// `PUT /api/ref-kecamatan/{id}` — partial update; a given name must not be blank.
///
/// # Errors
/// Returns 400 for bad input, 404 when missing, 409 on a duplicate.
pub async fn put_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(b): JsonBody,
) -> Result<Json<Value>, ApiError> {
    let id = key(&id, "Invalid id")?;
    let mut patch = Patch::new();
    for col in ["kddesa", "kdkecamatan"] {
        patch.set_opt(col, coerce::opt_int(&b, col)?);
    }
    if b.get("nmkecamatan").is_some() {
        let Some(nm) = b.get("nmkecamatan").and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty()) else {
            return Err(ApiError::BadRequest("nmkecamatan harus string non-kosong".to_owned()));
        };
        patch.set("nmkecamatan", nm);
    }
    if patch.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".to_owned()));
    }
    let target = Target { table: TABLE, key: "id", id, fallback: "Failed to update" };
    target.patch(&state, &patch, "Not found", "kecamatan already exists").await?;
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("id", id));
    found(&state, &select, "Not found".to_owned(), "Failed to update").await.map(Json)
}

/// `DELETE /api/ref-kecamatan/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing, 409 while still referenced.
pub async fn delete_item(_: AnyKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = key(&id, "Invalid id")?;
    Target { table: TABLE, key: "id", id, fallback: "Failed to delete" }
        .remove(&state, "Not found")
        .await?;
    Ok(Json(json!({ "ok": true })))
}
