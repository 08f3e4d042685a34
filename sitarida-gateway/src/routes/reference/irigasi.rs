//! Irrigation network register (`refirigasi`), joined to its district.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use sitarida_core::{coerce, NumericMode, Patch};
use sitarida_store::{lookup, query, Criterion, Select};

use super::{found, kecamatan::SearchQuery, key, Target};
use crate::{
    auth::AnyKey,
    body::JsonBody,
    error::{ApiError, Context},
    routes::{insert_id, trimmed},
    state::AppState,
};

const TABLE: &str = "refirigasi";
const COLUMNS: &str = "a.kdirigasi, a.msirigasi, a.kdkecamatan, b.nmkecamatan";
const SOURCE: &str = "refirigasi a INNER JOIN refkecamatan b ON a.kdkecamatan = b.kdkecamatan";
const INVALID: &str = "kdirigasi tidak valid (harus integer > 0)";

fn joined(kdirigasi: i64) -> Select {
    Select::new(COLUMNS, SOURCE).filter(Criterion::eq("a.kdirigasi", kdirigasi))
}

fn name(raw: &Value) -> Result<String, ApiError> {
    coerce::to_str(raw)
        .filter(|s| coerce::fits(s, 255))
        .ok_or_else(|| ApiError::BadRequest("msirigasi wajib diisi (maks 255 karakter)".to_owned()))
}

/// Checks a district code against `refkecamatan`.
async fn district(state: &AppState, raw: &Value, fallback: &'static str) -> Result<String, ApiError> {
    let Some(kd) = coerce::to_str(raw).filter(|s| coerce::fits(s, 10)) else {
        return Err(ApiError::BadRequest("kdkecamatan wajib diisi (maks 10 karakter)".to_owned()));
    };
    let Some(code) = kd.parse::<i64>().ok().filter(|n| *n > 0) else {
        return Err(ApiError::BadRequest(
            "kdkecamatan wajib berupa angka integer > 0 (sesuai referensi)".to_owned(),
        ));
    };
    if !lookup::kecamatan_exists(&state.pool, code).await.context(fallback)? {
        return Err(ApiError::BadRequest(
            "kdkecamatan tidak ditemukan di referensi kecamatan".to_owned(),
        ));
    }
    Ok(kd)
}

/// `GET /api/ref-irigasi` — `?search` matches name, district code and name, or the exact code.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list(_: AnyKey, State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Result<Json<Value>, ApiError> {
    let search = trimmed(q.search.as_ref()).map(|s| {
        let mut any = vec![
            Criterion::contains("a.msirigasi", s),
            Criterion::contains("a.kdkecamatan", s),
            Criterion::contains("b.nmkecamatan", s),
        ];
        if let Ok(n) = s.parse::<i64>() {
            any.push(Criterion::eq("a.kdirigasi", n));
        }
        Criterion::Any(any)
    });
    let select = Select::new(COLUMNS, SOURCE)
        .filter_opt(search)
        .order_by("a.kdkecamatan ASC, a.kdirigasi ASC");
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context("Failed to fetch irigasi")?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/ref-irigasi`
///
/// # Errors
/// Returns 400 for bad fields or an unknown district, 409 on a duplicate.
pub async fn create(
    _: AnyKey,
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FALLBACK: &str = "Gagal menambahkan irigasi";
    let (Some(nm), Some(kd)) = (b.get("msirigasi"), b.get("kdkecamatan")) else {
        return Err(ApiError::BadRequest("Body tidak valid. Wajib { msirigasi, kdkecamatan }".to_owned()));
    };
    let msirigasi = name(nm)?;
    let kdkecamatan = district(&state, kd, FALLBACK).await?;
    let mut patch = Patch::new();
    patch.set("msirigasi", msirigasi).set("kdkecamatan", kdkecamatan);
    let kdirigasi = match query::insert(&state.pool, TABLE, &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => {
            return Err(ApiError::Conflict("Data duplikat (nilai unik sudah digunakan)".to_owned()))
        }
        Err(e) => return Err(e).context(FALLBACK),
    };
    tracing::info!(kdirigasi, "irrigation network registered");
    let row = found(&state, &joined(kdirigasi), "Data tidak ditemukan".to_owned(), FALLBACK).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/ref-irigasi/{kdirigasi}`
///
/// # Errors
/// Returns 400 for a bad code, 404 when missing.
pub async fn get_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path(kdirigasi): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let kdirigasi = key(&kdirigasi, INVALID)?;
    found(&state, &joined(kdirigasi), "Data tidak ditemukan".to_owned(), "Failed to fetch irigasi")
        .await
        .map(Json)
}

/// `PUT /api/ref-irigasi/{kdirigasi}` — name and/or district.
///
/// # Errors
/// Returns 400 for bad input, 404 when missing, 409 on a duplicate.
pub async fn put_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path(kdirigasi): Path<String>,
    JsonBody(b): JsonBody,
) -> Result<Json<Value>, ApiError> {
    const FALLBACK: &str = "Gagal update irigasi";
    let kdirigasi = key(&kdirigasi, INVALID)?;
    let (nm, kd) = (b.get("msirigasi"), b.get("kdkecamatan"));
    if nm.is_none() && kd.is_none() {
        return Err(ApiError::BadRequest("Tidak ada field untuk diupdate".to_owned()));
    }
    let mut patch = Patch::new();
    if let Some(nm) = nm {
        patch.set("msirigasi", name(nm)?);
    }
    if let Some(kd) = kd {
        patch.set("kdkecamatan", district(&state, kd, FALLBACK).await?);
    }
    Target { table: TABLE, key: "kdirigasi", id: kdirigasi, fallback: FALLBACK }
        .patch(&state, &patch, "Data tidak ditemukan", "Conflict: data duplikat")
        .await?;
    found(&state, &joined(kdirigasi), "Data tidak ditemukan".to_owned(), FALLBACK)
        .await
        .map(Json)
}

/// `DELETE /api/ref-irigasi/{kdirigasi}`
///
/// # Errors
/// Returns 400 for a bad code, 404 when missing, 409 while condition rows reference it.
pub async fn delete_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path(kdirigasi): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let kdirigasi = key(&kdirigasi, INVALID)?;
    Target { table: TABLE, key: "kdirigasi", id: kdirigasi, fallback: "Gagal menghapus irigasi" }
        .remove(&state, "Data tidak ditemukan")
        .await?;
    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testkit::send_json;
    use crate::state::testing::USERS_KEY;

    #[tokio::test]
    async fn create_validates_before_the_district_lookup() {
        let uri = "/api/ref-irigasi";
        let (status, body) = send_json(Method::POST, uri, Some(USERS_KEY), json!({"msirigasi": "D.I. Aek"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Body tidak valid. Wajib { msirigasi, kdkecamatan }");

        let (_, body) = send_json(
            Method::POST,
            uri,
            Some(USERS_KEY),
            json!({"msirigasi": "D.I. Aek", "kdkecamatan": "A1"}),
        )
        .await;
        assert_eq!(body["error"], "kdkecamatan wajib berupa angka integer > 0 (sesuai referensi)");
    }

    #[tokio::test]
    async fn put_needs_a_field() {
        let (status, body) = send_json(Method::PUT, "/api/ref-irigasi/3", Some(USERS_KEY), json!({"x": 1})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Tidak ada field untuk diupdate");
    }
}
