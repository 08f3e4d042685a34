//! Bridge register (`refjembatan`), keyed by `kdjembatan`.

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

const TABLE: &str = "refjembatan";
const COLUMNS: &str = "kdjembatan, nmjembatan, kdkecamatan";
const INVALID: &str = "Invalid ID: must be a positive integer";

fn missing(id: i64) -> String {
    format!("Jembatan dengan ID {id} tidak ditemukan")
}

fn by_key(id: i64) -> Select {
    Select::new(COLUMNS, TABLE).filter(Criterion::eq("kdjembatan", id))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub kdjembatan: Option<String>,
    pub kdkecamatan: Option<String>,
    pub search: Option<String>,
}

/// `GET /api/ref-jembatan`
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list(_: AnyKey, State(state): State<AppState>, Query(q): Query<ListQuery>) -> Result<Json<Value>, ApiError> {
    let search = trimmed(q.search.as_ref()).map(|s| {
        Criterion::Any(vec![Criterion::contains("nmjembatan", s), Criterion::contains("kdkecamatan", s)])
    });
    let kdjembatan = trimmed(q.kdjembatan.as_ref()).and_then(|s| s.parse::<i64>().ok());
    let select = Select::new(COLUMNS, TABLE)
        .filter_opt(kdjembatan.map(|k| Criterion::eq("kdjembatan", k)))
        .filter_opt(trimmed(q.kdkecamatan.as_ref()).map(|k| Criterion::eq("kdkecamatan", k)))
        .filter_opt(search)
        .order_by("kdkecamatan ASC, nmjembatan ASC, kdjembatan ASC");
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context("Failed to fetch jembatan")?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/ref-jembatan` — `kdjembatan` is optional and auto-assigned when absent.
///
/// # Errors
/// Returns 400 for bad fields, 409 when the code is taken.
pub async fn create(
    _: AnyKey,
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FALLBACK: &str = "Gagal menambahkan data jembatan";
    let kdjembatan = coerce::opt_int(&b, "kdjembatan")?;
    let Some(nama) = coerce::opt_str(&b, "nmjembatan").filter(|s| coerce::fits(s, 255)) else {
        return Err(ApiError::BadRequest("nmjembatan wajib diisi (maks 255 karakter)".to_owned()));
    };
    let Some(kdkecamatan) = coerce::opt_str(&b, "kdkecamatan").filter(|s| coerce::fits(s, 10)) else {
        return Err(ApiError::BadRequest("kdkecamatan wajib diisi (maks 10 karakter)".to_owned()));
    };
    let mut patch = Patch::new();
    patch
        .set_opt("kdjembatan", kdjembatan)
        .set("nmjembatan", nama)
        .set("kdkecamatan", kdkecamatan);
    let id = match query::insert(&state.pool, TABLE, &patch).await {
        Ok(id) => match kdjembatan {
            Some(k) => k,
            None => insert_id(id)?,
        },
        Err(e) if e.is_conflict() => {
            return Err(ApiError::Conflict("Data duplikat (nilai unik/ID sudah digunakan)".to_owned()))
        }
        Err(e) => return Err(e).context(FALLBACK),
    };
    tracing::info!(kdjembatan = id, "bridge registered");
    let row = found(&state, &by_key(id), missing(id), FALLBACK).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/ref-jembatan/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn get_item(_: AnyKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = key(&id, INVALID)?;
    found(&state, &by_key(id), missing(id), "Terjadi kesalahan internal").await.map(Json)
}

/// `PUT /api/ref-jembatan/{id}` — name and district only; the code is fixed by the path.
///
/// # Errors
/// Returns 400 for bad input or a different `kdjembatan`, 404 when missing, 409 on a clash.
pub async fn put_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(b): JsonBody,
) -> Result<Json<Value>, ApiError> {
    const FALLBACK: &str = "Gagal memperbarui data jembatan";
    let id = key(&id, INVALID)?;
    if b.get("kdjembatan").is_some_and(|v| coerce::to_int(v) != Some(id)) {
        return Err(ApiError::BadRequest(
            "kdjembatan tidak boleh diubah; gunakan path parameter /[id]".to_owned(),
        ));
    }
    let nama = coerce::opt_str(&b, "nmjembatan");
    if nama.as_deref().is_some_and(|s| !coerce::fits(s, 255)) {
        return Err(ApiError::BadRequest("nmjembatan maksimal 255 karakter".to_owned()));
    }
    let kdkecamatan = coerce::opt_str(&b, "kdkecamatan");
    if kdkecamatan.as_deref().is_some_and(|s| !coerce::fits(s, 10)) {
        return Err(ApiError::BadRequest("kdkecamatan maksimal 10 karakter".to_owned()));
    }
    let mut patch = Patch::new();
    patch.set_opt("nmjembatan", nama).set_opt("kdkecamatan", kdkecamatan);
    if patch.is_empty() {
        return found(&state, &by_key(id), missing(id), FALLBACK).await.map(Json);
    }
    Target { table: TABLE, key: "kdjembatan", id, fallback: FALLBACK }
        .patch(&state, &patch, &missing(id), "Konflik data (nilai unik sudah digunakan)")
        .await?;
    found(&state, &by_key(id), missing(id), FALLBACK).await.map(Json)
}

/// `DELETE /api/ref-jembatan/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn delete_item(_: AnyKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = key(&id, INVALID)?;
    Target { table: TABLE, key: "kdjembatan", id, fallback: "Gagal menghapus data jembatan" }
        .remove(&state, "Jembatan tidak ditemukan")
        .await?;
    Ok(Json(json!({ "ok": true, "message": format!("Jembatan ID {id} berhasil dihapus") })))
}
