//! Public health: child mortality behind life expectancy, stunting
//! prevalence, and the health indicator pivot.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use sitarida_core::{coerce, indicator::KESEHATAN, Aksi, NumericMode, Patch};
use sitarida_store::{query, Criterion, Select};

use crate::{
    auth::AnyKey,
    body::{now, JsonBody},
    error::{ApiError, Context},
    routes::{
        district_year::{self, DistrictYear},
        indicator::pivot,
        insert_id, trimmed,
    },
    state::AppState,
};

// ── Usia harapan hidup ──────────────────────────────────────────

const KEMATIAN_COLUMNS: &str = "id, tahun, idkecamatan, nmkecamatan, jumkem0_4Tahun, jumkem5_9Tahun, \
    jumkem10_14Tahun, jumkem15_19Tahun, verif, datecreate, username, aksi";

const KEMATIAN_COUNTS: [&str; 4] = ["jumkem0_4Tahun", "jumkem5_9Tahun", "jumkem10_14Tahun", "jumkem15_19Tahun"];

#[derive(Debug, Default, Deserialize)]
pub struct KematianQuery {
    pub id: Option<String>,
    pub tahun: Option<String>,
    pub idkecamatan: Option<String>,
}

/// `GET /api/keseheatanmasyarakat/1usiaharapanhidup` — child deaths per district and year.
///
/// # Errors
/// Returns 404 for a missing `?id`, 500 on database failure.
pub async fn list_kematian(
    _: AnyKey,
    State(state): State<AppState>,
    Query(q): Query<KematianQuery>,
) -> Result<Json<Value>, ApiError> {
    const FALLBACK: &str = "Gagal mengambil data kematian";
    let num = |raw: Option<&String>| trimmed(raw).and_then(coerce::parse_id);
    if let Some(id) = num(q.id.as_ref()) {
        let select = Select::new(KEMATIAN_COLUMNS, "tblkematian").filter(Criterion::eq("id", id));
        return query::fetch_optional(&state.pool, &select, NumericMode::Raw)
            .await
            .context(FALLBACK)?
            .map(Json)
            .ok_or_else(|| ApiError::NotFound("Data tidak ditemukan".to_owned()));
    }
    let select = Select::new(KEMATIAN_COLUMNS, "tblkematian")
        .filter_opt(num(q.tahun.as_ref()).map(|t| Criterion::eq("tahun", t)))
        .filter_opt(num(q.idkecamatan.as_ref()).map(|k| Criterion::eq("idkecamatan", k)))
        .order_by("tahun DESC, id ASC")
        .limit(1000);
    let rows = query::fetch_all(&state.pool, &select, NumericMode::Raw)
        .await
        .context(FALLBACK)?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/keseheatanmasyarakat/1usiaharapanhidup`
///
/// `username` defaults to `admin`; `aksi` to `CREATE`.
///
/// # Errors
/// Returns 400 for an invalid year or district or an existing pair.
pub async fn create_kematian(
    _: AnyKey,
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FALLBACK: &str = "Gagal membuat data kematian";
    let positive = |key: &str| coerce::field(&b, key).and_then(coerce::to_int).filter(|n| *n > 0);
    let Some(tahun) = positive("tahun") else {
        return Err(ApiError::BadRequest("Tahun wajib angka > 0".to_owned()));
    };
    let Some(idkecamatan) = positive("idkecamatan") else {
        return Err(ApiError::BadRequest("idkecamatan wajib angka > 0".to_owned()));
    };
    let duplicate = || ApiError::BadRequest("Data dengan tahun dan idkecamatan yang sama sudah ada".to_owned());
    let clash = [Criterion::eq("tahun", tahun), Criterion::eq("idkecamatan", idkecamatan)];
    if query::exists(&state.pool, "tblkematian", &clash).await.context(FALLBACK)? {
        return Err(duplicate());
    }

    let mut patch = Patch::new();
    patch
        .set("idkecamatan", idkecamatan)
        .set("nmkecamatan", coerce::opt_str(&b, "nmkecamatan").unwrap_or_default());
    for col in KEMATIAN_COUNTS {
        patch.set_opt(col, coerce::opt_int(&b, col)?);
    }
    let aksi = coerce::opt_str(&b, "aksi")
        .and_then(|a| a.parse::<Aksi>().ok())
        .unwrap_or(Aksi::Create);
    patch
        .set("tahun", tahun)
        .set("verif", b.get("verif").and_then(coerce::to_flag).unwrap_or(false));
    patch.audit(
        Some(coerce::opt_str(&b, "username").unwrap_or_else(|| "admin".to_owned())),
        aksi,
        now(),
    );

    let id = match query::insert(&state.pool, "tblkematian", &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => return Err(duplicate()),
        Err(e) => return Err(e).context(FALLBACK),
    };
    tracing::info!(id, tahun, idkecamatan, "mortality row created");
    let select = Select::new(KEMATIAN_COLUMNS, "tblkematian").filter(Criterion::eq("id", id));
    let row = query::fetch_one(&state.pool, &select, NumericMode::Raw)
        .await
        .context(FALLBACK)?;
    Ok((StatusCode::CREATED, Json(row)))
}

// ── Stunting ────────────────────────────────────────────────────

pub const STUNTING: DistrictYear = DistrictYear {
    table: "tblPrevalensiStunting",
    counts: &["jumlahBalita", "balitaStunting"],
    derived: "persentase",
    derive: district_year::stunting_persentase,
    duplicate_status: StatusCode::CONFLICT,
    duplicate_message: "Data dengan kombinasi kecamatan dan tahun sudah ada",
    existing_columns: "id, nmkecamatan, jumlahBalita, balitaStunting, persentase",
    fallback: [
        "Gagal mengambil data prevalensi stunting",
        "Gagal menambahkan data prevalensi stunting",
        "Gagal mengambil data prevalensi stunting",
        "Gagal memperbarui data prevalensi stunting",
        "Gagal menghapus data prevalensi stunting",
    ],
};

/// Filters shared by the district-year listings.
#[derive(Debug, Default, Deserialize)]
pub struct DistrictQuery {
    pub tahun: Option<String>,
    pub kecamatan: Option<String>,
}

/// `GET /api/keseheatanmasyarakat/3stunting` — filter by `?tahun` and `?kecamatan`.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list_stunting(
    State(state): State<AppState>,
    Query(q): Query<DistrictQuery>,
) -> Result<Json<Value>, ApiError> {
    let rows = district_year::list(&state, &STUNTING, q.tahun.as_deref(), q.kecamatan.as_deref()).await?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/keseheatanmasyarakat/3stunting` — prevalence is computed, never taken from the body.
///
/// # Errors
/// Returns 400 for invalid counts, 409 with `existingData` for an existing pair.
pub async fn create_stunting(
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let row = district_year::create(&state, &STUNTING, &b).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/keseheatanmasyarakat/3stunting/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn get_stunting(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    district_year::get(&state, &STUNTING, &id).await.map(Json)
}

/// `PUT /api/keseheatanmasyarakat/3stunting/{id}` — merge and recompute prevalence.
///
/// # Errors
/// Returns 400 for bad input, 404 when missing, 409 on a clash.
pub async fn put_stunting(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(b): JsonBody,
) -> Result<Json<Value>, ApiError> {
    district_year::update(&state, &STUNTING, &id, &b).await.map(Json)
}

/// `DELETE /api/keseheatanmasyarakat/3stunting/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn delete_stunting(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    district_year::delete(&state, &STUNTING, &id).await?;
    Ok(Json(serde_json::json!({ "message": "Data berhasil dihapus" })))
}

// ── Pivot ───────────────────────────────────────────────────────

/// `GET /api/keseheatanmasyarakat` — yearly life expectancy, stunting and TBC targets.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn summary(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    pivot(&state, &KESEHATAN).await
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testkit::{send, send_json};
    use crate::state::testing::USERS_KEY;

    #[tokio::test]
    async fn mortality_requires_a_key() {
        let (status, _) = send(Method::GET, "/api/keseheatanmasyarakat/1usiaharapanhidup", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn mortality_checks_year_before_district() {
        let uri = "/api/keseheatanmasyarakat/1usiaharapanhidup";
        let (status, body) = send_json(Method::POST, uri, Some(USERS_KEY), json!({"idkecamatan": 2})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Tahun wajib angka > 0");

        let (_, body) = send_json(Method::POST, uri, Some(USERS_KEY), json!({"tahun": 2024})).await;
        assert_eq!(body["error"], "idkecamatan wajib angka > 0");
    }

    #[tokio::test]
    async fn stunting_counts_must_be_whole() {
        let body = json!({
            "kdkecamatan": 1, "nmkecamatan": "AEK", "tahun": 2024,
            "jumlahBalita": 10.5, "balitaStunting": 1
        });
        let (status, body) = send_json(Method::POST, "/api/keseheatanmasyarakat/3stunting", None, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Field jumlahBalita harus berupa bilangan bulat");
    }

    #[tokio::test]
    async fn stunting_item_ids_are_validated() {
        let (status, body) = send(Method::DELETE, "/api/keseheatanmasyarakat/3stunting/x", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ID harus integer positif");
    }
}
