//! Population by district and year (`refPenduduk`). Public.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    body::JsonBody,
    error::ApiError,
    routes::{
        district_year::{self, DistrictYear},
        kesehatan::DistrictQuery,
    },
    state::AppState,
};

pub const PENDUDUK: DistrictYear = DistrictYear {
    table: "refPenduduk",
    counts: &[
        "lakiLaki",
        "perempuan",
        "jumlahkk",
        "pop04tahun",
        "pop59tahun",
        "pop1014tahun",
        "pop1519tahun",
    ],
    derived: "total",
    derive: district_year::penduduk_total,
    duplicate_status: StatusCode::BAD_REQUEST,
    duplicate_message: "Data dengan kombinasi tahun dan kecamatan sudah ada",
    existing_columns: "id, nmkecamatan, total",
    fallback: [
        "Gagal mengambil data penduduk",
        "Gagal menambahkan data penduduk",
        "Gagal mengambil data penduduk",
        "Gagal memperbarui data penduduk",
        "Gagal menghapus data penduduk",
    ],
};

/// `GET /api/ref-penduduk` — filter by `?tahun` and `?kecamatan`.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list(State(state): State<AppState>, Query(q): Query<DistrictQuery>) -> Result<Json<Value>, ApiError> {
    let rows = district_year::list(&state, &PENDUDUK, q.tahun.as_deref(), q.kecamatan.as_deref()).await?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/ref-penduduk` — `total` is the sum of men and women.
///
/// # Errors
/// Returns 400 for invalid counts or an existing district-year pair.
pub async fn create(State(state): State<AppState>, JsonBody(b): JsonBody) -> Result<(StatusCode, Json<Value>), ApiError> {
    let row = district_year::create(&state, &PENDUDUK, &b).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/ref-penduduk/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn get_item(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    district_year::get(&state, &PENDUDUK, &id).await.map(Json)
}

/// `PUT /api/ref-penduduk/{id}`
///
/// # Errors
/// Returns 400 for bad input or a clash, 404 when missing.
pub async fn put_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(b): JsonBody,
) -> Result<Json<Value>, ApiError> {
    district_year::update(&state, &PENDUDUK, &id, &b).await.map(Json)
}

/// `DELETE /api/ref-penduduk/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn delete_item(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    district_year::delete(&state, &PENDUDUK, &id).await?;
    Ok(Json(json!({ "message": "Data berhasil dihapus" })))
}
