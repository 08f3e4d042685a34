//! Government agencies (`refopd`).

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
    auth::AnyKey,
    body::JsonBody,
    error::{ApiError, Context},
    routes::{insert_id, trimmed},
    state::AppState,
};

const TABLE: &str = "refopd";
const COLUMNS: &str = "id, kdopd, nmopd";
const NOT_FOUND: &str = "OPD tidak ditemukan";
const TAKEN: &str = "Kode OPD sudah digunakan";

/// `GET /api/ref-opd` — codes and names ordered by code.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list(_: AnyKey, State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Result<Json<Value>, ApiError> {
    let search = trimmed(q.search.as_ref()).map(|s| {
        let mut any = vec![Criterion::contains("nmopd", s)];
        if s.bytes().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = s.parse::<i64>() {
                any.push(Criterion::eq("kdopd", n));
            }
        }
        Criterion::Any(any)
    });
    let select = Select::new("kdopd, nmopd", TABLE).filter_opt(search).order_by("kdopd ASC");
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context("Gagal mengambil data OPD")?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/ref-opd`
///
/// # Errors
/// Returns 400 for a missing or non-numeric code and for a code already in use.
pub async fn create(
    _: AnyKey,
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FALLBACK: &str = "Gagal menambahkan OPD";
    let (Some(raw), Some(nmopd)) = (coerce::field(&b, "kdopd"), coerce::opt_str(&b, "nmopd")) else {
        return Err(ApiError::BadRequest("kdopd dan nmopd wajib diisi".to_owned()));
    };
    let Some(kdopd) = coerce::to_int(raw) else {
        return Err(ApiError::BadRequest("kdopd harus berupa angka".to_owned()));
    };
    let mut patch = Patch::new();
    patch.set("kdopd", kdopd).set("nmopd", nmopd);
    let id = match query::insert(&state.pool, TABLE, &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => return Err(ApiError::BadRequest(TAKEN.to_owned())),
        Err(e) => return Err(e).context(FALLBACK),
    };
    tracing::info!(id, kdopd, "agency created");
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("id", id));
    let row = found(&state, &select, NOT_FOUND.to_owned(), FALLBACK).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/ref-opd/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn get_item(_: AnyKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = key(&id, "ID tidak valid")?;
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("id", id));
    found(&state, &select, NOT_FOUND.to_owned(), "Gagal mengambil data").await.map(Json)
}

/// `PUT /api/ref-opd/{id}` — change the code, the name, or both.
///
/// # Errors
/// Returns 400 for bad input, 404 when missing, 409 when the code is taken.
pub async fn put_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(b): JsonBody,
) -> Result<Json<Value>, ApiError> {
    const FALLBACK: &str = "Gagal memperbarui OPD";
    let id = key(&id, "ID tidak valid")?;
    let kdopd = coerce::field(&b, "kdopd");
    let nmopd = coerce::opt_str(&b, "nmopd");
    if kdopd.is_none() && b.get("nmopd").is_none_or(Value::is_null) {
        return Err(ApiError::BadRequest("Harus mengisi kdopd atau nmopd".to_owned()));
    }
    let mut patch = Patch::new();
    if let Some(raw) = kdopd {
        let Some(n) = coerce::to_int(raw).filter(|n| *n > 0) else {
            return Err(ApiError::BadRequest("kdopd harus berupa angka positif".to_owned()));
        };
        patch.set("kdopd", n);
    }
    patch.set_opt("nmopd", nmopd);
    if patch.is_empty() {
        return Err(ApiError::BadRequest("Tidak ada perubahan".to_owned()));
    }
    Target { table: TABLE, key: "id", id, fallback: FALLBACK }
        .patch(&state, &patch, NOT_FOUND, TAKEN)
        .await?;
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("id", id));
    found(&state, &select, NOT_FOUND.to_owned(), FALLBACK).await.map(Json)
}

/// `DELETE /api/ref-opd/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing, 409 while still referenced.
pub async fn delete_item(_: AnyKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = key(&id, "ID tidak valid")?;
    Target { table: TABLE, key: "id", id, fallback: "Gagal menghapus OPD" }
        .remove(&state, NOT_FOUND)
        .await?;
    Ok(Json(json!({ "ok": true, "message": "OPD berhasil dihapus" })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testkit::send_json;
    use crate::state::testing::USERS_KEY;

    #[tokio::test]
    async fn create_requires_a_numeric_code() {
        let uri = "/api/ref-opd";
        let (status, body) = send_json(Method::POST, uri, Some(USERS_KEY), json!({"nmopd": "Dinas"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "kdopd dan nmopd wajib diisi");

        let (_, body) = send_json(Method::POST, uri, Some(USERS_KEY), json!({"kdopd": "x1", "nmopd": "Dinas"})).await;
        assert_eq!(body["error"], "kdopd harus berupa angka");
    }

    #[tokio::test]
    async fn put_needs_something_to_change() {
        let uri = "/api/ref-opd/2";
        let (_, body) = send_json(Method::PUT, uri, Some(USERS_KEY), json!({})).await;
        assert_eq!(body["error"], "Harus mengisi kdopd atau nmopd");

        let (_, body) = send_json(Method::PUT, uri, Some(USERS_KEY), json!({"kdopd": 0})).await;
        assert_eq!(body["error"], "kdopd harus berupa angka positif");

        let (_, body) = send_json(Method::PUT, uri, Some(USERS_KEY), json!({"nmopd": "  "})).await;
        assert_eq!(body["error"], "Tidak ada perubahan");
    }
}
