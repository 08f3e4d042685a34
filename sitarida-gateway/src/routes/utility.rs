//! Drinking water access (`tblaksesairminum`) and electricity supply
//! (`tbldayalistrik`) per district and year. Both are public.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::{
    body::JsonBody,
    error::ApiError,
    routes::{
        fields::Kind,
        record::{self, RecordTable},
    },
    state::AppState,
};

pub const AIR_MINUM: RecordTable = RecordTable {
    table: "tblaksesairminum",
    columns: "id, kdkecamatan, nmkecamatan, jmlpenduduk, jmlairminumlayak, persentaseairminum, tahun",
    fields: &[
        ("tahun", Kind::Int),
        ("jmlpenduduk", Kind::Int),
        ("jmlairminumlayak", Kind::Int),
        ("persentaseairminum", Kind::Decimal),
        ("kdkecamatan", Kind::Text(10)),
        ("nmkecamatan", Kind::Text(100)),
    ],
    unique: ["kdkecamatan", "tahun"],
    duplicate_create: "Data dengan kecamatan dan tahun ini sudah ada",
    duplicate_update: "Kombinasi kecamatan dan tahun sudah ada di database",
    fallback: [
        "Terjadi kesalahan pada server",
        "Gagal menambahkan data",
        "Gagal memperbarui data",
        "Gagal menghapus data",
    ],
};

/// `rasiopersen` is a generated column: read, never written.
pub const LISTRIK: RecordTable = RecordTable {
    table: "tbldayalistrik",
    columns: "id, nmkecamatan, tahun, dayatersedia, dayadibutuhkan, rasiopersen",
    fields: &[
        ("nmkecamatan", Kind::Text(100)),
        ("tahun", Kind::Int),
        ("dayatersedia", Kind::Decimal),
        ("dayadibutuhkan", Kind::Decimal),
    ],
    unique: ["nmkecamatan", "tahun"],
    duplicate_create: "Kombinasi kecamatan dan tahun sudah ada di database",
    duplicate_update: "Kombinasi kecamatan dan tahun sudah ada di database",
    fallback: [
        "Gagal mengambil data",
        "Gagal membuat data",
        "Gagal memperbarui data",
        "Gagal menghapus data",
    ],
};

// ── Air minum ───────────────────────────────────────────────────

/// `GET /api/infrastuktur/5aksesairminum` — every district-year row.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list_air_minum(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    record::list(&state, &AIR_MINUM).await.map(|rows| Json(Value::Array(rows)))
}

/// `POST /api/infrastuktur/5aksesairminum` — add a district-year row.
///
/// # Errors
/// Returns 400 for a missing field or an existing district-year pair.
pub async fn create_air_minum(
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let row = record::create(&state, &AIR_MINUM, &b).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/infrastuktur/5aksesairminum/{id}`
///
/// # Errors
/// Returns 404 when missing.
pub async fn get_air_minum(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    record::get(&state, &AIR_MINUM, &id).await.map(Json)
}

/// `PUT /api/infrastuktur/5aksesairminum/{id}` — replace a row.
///
/// # Errors
/// Returns 400 for a missing field or a clash, 404 when missing.
pub async fn put_air_minum(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(b): JsonBody,
) -> Result<Json<Value>, ApiError> {
    record::update(&state, &AIR_MINUM, &id, &b).await.map(Json)
}

/// `DELETE /api/infrastuktur/5aksesairminum/{id}`
///
/// # Errors
/// Returns 404 when missing.
pub async fn delete_air_minum(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    record::delete(&state, &AIR_MINUM, &id).await.map(Json)
}

// ── Listrik ─────────────────────────────────────────────────────

/// `GET /api/infrastuktur/6ketersediaanlistrik` — every district-year row.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list_listrik(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    record::list(&state, &LISTRIK).await.map(|rows| Json(Value::Array(rows)))
}

/// `POST /api/infrastuktur/6ketersediaanlistrik`
///
/// # Errors
/// Returns 400 for a missing field or an existing district-year pair.
pub async fn create_listrik(
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let row = record::create(&state, &LISTRIK, &b).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/infrastuktur/6ketersediaanlistrik/{id}`
///
/// # Errors
/// Returns 404 when missing.
pub async fn get_listrik(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    record::get(&state, &LISTRIK, &id).await.map(Json)
}

/// `PUT /api/infrastuktur/6ketersediaanlistrik/{id}`
///
/// # Errors
/// Returns 400 for a missing field or a clash, 404 when missing.
pub async fn put_listrik(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(b): JsonBody,
) -> Result<Json<Value>, ApiError> {
    record::update(&state, &LISTRIK, &id, &b).await.map(Json)
}

/// `DELETE /api/infrastuktur/6ketersediaanlistrik/{id}`
///
/// # Errors
/// Returns 404 when missing.
pub async fn delete_listrik(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    record::delete(&state, &LISTRIK, &id).await.map(Json)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testkit::send_json;

    #[tokio::test]
    async fn air_minum_requires_every_field_without_a_key() {
        let (status, body) = send_json(
            Method::POST,
            "/api/infrastuktur/5aksesairminum",
            None,
            json!({"tahun": 2024, "kdkecamatan": "1"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Semua field wajib diisi");
    }

    #[tokio::test]
    async fn listrik_rejects_bad_decimals() {
        let (status, body) = send_json(
            Method::PUT,
            "/api/infrastuktur/6ketersediaanlistrik/3",
            None,
            json!({"nmkecamatan": "AEK", "tahun": 2024, "dayatersedia": "banyak", "dayadibutuhkan": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Nilai desimal tidak valid: banyak");
    }
}
