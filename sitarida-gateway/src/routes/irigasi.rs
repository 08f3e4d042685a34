//! Irrigation network condition per year (`tblirigasi`).

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Datelike;
use serde::Deserialize;
use serde_json::Value;
use sitarida_core::{coerce, Aksi, NumericMode, Patch};
use sitarida_store::{lookup, query, Criterion, Select};

use crate::{
    auth::AnyKey,
    body::{audit_username, now, JsonBody},
    error::{ApiError, Context},
    routes::{
        fields::Kind,
        insert_id, trimmed,
        yearly::{self, KeyKind, YearRule, YearlyTable},
    },
    state::AppState,
};

const COLUMNS: &str = "a.id, a.kdirigasi, b.msirigasi, a.kdkecamatan, c.nmkecamatan, a.luas, a.tahun, \
    a.konirigasibaik, a.konirigasisedang, a.konirigasirusakringan, a.konirigasirusakberat, \
    a.verif, a.username, a.aksi, a.datecreate";

const SOURCE: &str = "tblirigasi a \
    INNER JOIN refirigasi b ON a.kdirigasi = b.kdirigasi \
    INNER JOIN refkecamatan c ON a.kdkecamatan = c.kdkecamatan";

const ROW_COLUMNS: &str = "id, kdirigasi, nmirigasi, kdkecamatan, nmkecamatan, luas, tahun, \
    konirigasibaik, konirigasisedang, konirigasirusakringan, konirigasirusakberat, \
    verif, datecreate, username, aksi";

const DECIMALS: [&str; 5] = [
    "luas",
    "konirigasibaik",
    "konirigasisedang",
    "konirigasirusakringan",
    "konirigasirusakberat",
];

const FALLBACK: &str = "Gagal mengambil data irigasi";

/// Item routes over `(kdirigasi, tahun)`.
pub const TABLE: YearlyTable = YearlyTable {
    table: "tblirigasi",
    key: "kdirigasi",
    key_label: "kdirigasi",
    key_kind: KeyKind::Int,
    year_rule: YearRule::Positive,
    columns: COLUMNS,
    source: SOURCE,
    key_expr: "a.kdirigasi",
    tahun_expr: "a.tahun",
    fields: &[
        ("kdkecamatan", Kind::Text(10)),
        ("luas", Kind::Decimal),
        ("konirigasibaik", Kind::Decimal),
        ("konirigasisedang", Kind::Decimal),
        ("konirigasirusakringan", Kind::Decimal),
        ("konirigasirusakberat", Kind::Decimal),
        ("verif", Kind::Flag),
    ],
    sample: None,
    mode: NumericMode::JsonSafe,
    fallback: [FALLBACK, "Gagal update data irigasi", "Gagal menghapus data irigasi"],
};

/// Query string of the collection routes.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Network code.
    pub kdirigasi: Option<String>,
    /// Year.
    pub tahun: Option<String>,
    /// Network name, district name or district code text.
    pub search: Option<String>,
}

fn positive(raw: Option<&String>) -> Option<i64> {
    trimmed(raw).and_then(coerce::parse_id)
}

async fn listing(
    state: &AppState,
    kdirigasi: Option<i64>,
    tahun: Option<i64>,
    search: Option<&str>,
) -> Result<Vec<Value>, ApiError> {
    let search = search.map(|s| {
        Criterion::Any(vec![
            Criterion::contains("b.msirigasi", s),
            Criterion::contains("c.nmkecamatan", s),
            Criterion::contains("a.kdkecamatan", s),
        ])
    });
    let select = Select::new(COLUMNS, SOURCE)
        .filter_opt(kdirigasi.map(|k| Criterion::eq("a.kdirigasi", k)))
        .filter_opt(tahun.map(|t| Criterion::eq("a.tahun", t)))
        .filter_opt(search)
        .order_by("a.tahun DESC, a.kdirigasi ASC")
        .limit(1000);
    query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(FALLBACK)
}

async fn single(state: &AppState, kdirigasi: i64, tahun: i64) -> Result<Value, ApiError> {
    let select = Select::new(COLUMNS, SOURCE)
        .filter(Criterion::eq("a.kdirigasi", kdirigasi))
        .filter(Criterion::eq("a.tahun", tahun));
    query::fetch_optional(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(FALLBACK)?
        .ok_or_else(|| ApiError::NotFound("Data tidak ditemukan".to_owned()))
}

/// `GET /api/infrastuktur/4irigasikondisibaik` — one row for `kdirigasi`+`tahun`, or a filtered list.
///
/// # Errors
/// Returns 404 for a missing single row, 500 on database failure.
pub async fn list(_: AnyKey, State(state): State<AppState>, Query(q): Query<ListQuery>) -> Result<Json<Value>, ApiError> {
    let kdirigasi = positive(q.kdirigasi.as_ref());
    let tahun = positive(q.tahun.as_ref());
    if let (Some(k), Some(t)) = (kdirigasi, tahun) {
        return single(&state, k, t).await.map(Json);
    }
    let rows = listing(&state, kdirigasi, tahun, trimmed(q.search.as_ref())).await?;
    Ok(Json(Value::Array(rows)))
}

/// Year preceding `tahun`, or last calendar year when `tahun` is absent or 1.
#[must_use]
pub fn previous_year(tahun: Option<i64>, current: i64) -> i64 {
    match tahun {
        Some(t) if t > 1 => t - 1,
        _ => current - 1,
    }
}

/// `GET /api/infrastuktur/4irigasikondisibaik-prev` — the same listing for the previous year.
///
/// # Errors
/// Returns 404 for a missing single row, 500 on database failure.
pub async fn list_prev(
    _: AnyKey,
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let kdirigasi = positive(q.kdirigasi.as_ref());
    let tahun = positive(q.tahun.as_ref());
    let prev = previous_year(tahun, i64::from(chrono::Utc::now().year()));
    if prev <= 0 {
        return Err(ApiError::BadRequest("Tahun tidak valid".to_owned()));
    }
    if let (Some(k), Some(_)) = (kdirigasi, tahun) {
        return single(&state, k, prev).await.map(Json);
    }
    let rows = listing(&state, kdirigasi, Some(prev), trimmed(q.search.as_ref())).await?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/infrastuktur/4irigasikondisibaik` — record a network's condition for one year.
///
/// # Errors
/// Returns 400 on validation failure, 409 when the pair exists, 500 on
/// database failure.
pub async fn create(
    _: AnyKey,
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const CREATE_FALLBACK: &str = "Gagal membuat data irigasi";
    let kdirigasi = coerce::field(&b, "kdirigasi")
        .and_then(coerce::to_int)
        .filter(|n| *n > 0)
        .ok_or_else(|| ApiError::BadRequest("kdirigasi wajib angka > 0".to_owned()))?;
    let tahun = coerce::field(&b, "tahun")
        .and_then(coerce::to_int)
        .filter(|n| *n > 0)
        .ok_or_else(|| ApiError::BadRequest("tahun wajib angka > 0".to_owned()))?;
    let Some(kdkecamatan) = coerce::opt_str(&b, "kdkecamatan").filter(|k| coerce::fits(k, 10)) else {
        return Err(ApiError::BadRequest("kdkecamatan wajib diisi (maks 10 karakter)".to_owned()));
    };
    let verif = b.get("verif").and_then(coerce::to_flag).unwrap_or(false);

    let nmirigasi = match lookup::irigasi_name(&state.pool, kdirigasi).await.context(CREATE_FALLBACK)? {
        Some(n) => Some(n),
        None => coerce::opt_str(&b, "msirigasi"),
    };
    let nmkecamatan = match lookup::kecamatan_name(&state.pool, &kdkecamatan)
        .await
        .context(CREATE_FALLBACK)?
    {
        Some(n) => Some(n),
        None => coerce::opt_str(&b, "nmkecamatan"),
    };
    let aksi = coerce::opt_str(&b, "aksi")
        .and_then(|a| a.parse::<Aksi>().ok())
        .unwrap_or(Aksi::Create);

    let mut patch = Patch::new();
    patch
        .set("kdirigasi", kdirigasi)
        .set("tahun", tahun)
        .set("kdkecamatan", kdkecamatan)
        .set_opt("nmirigasi", nmirigasi)
        .set_opt("nmkecamatan", nmkecamatan);
    for col in DECIMALS {
        patch.set_opt(col, coerce::opt_dec(&b, col)?);
    }
    patch.set("verif", verif);
    patch.audit(audit_username(&b, &headers), aksi, now());

    let id = match query::insert(&state.pool, "tblirigasi", &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => {
            return Err(ApiError::Conflict("Data irigasi untuk kdirigasi+tahun sudah ada".to_owned()))
        }
        Err(e) => return Err(e).context(CREATE_FALLBACK),
    };
    tracing::info!(kdirigasi, tahun, id, "irrigation row created");

    let select = Select::new(ROW_COLUMNS, "tblirigasi").filter(Criterion::eq("id", id));
    let row = query::fetch_one(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(CREATE_FALLBACK)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/infrastuktur/4irigasikondisibaik/{kdirigasi}/{tahun}` — one network-year row.
///
/// # Errors
/// Returns 400 for bad segments, 404 when missing.
pub async fn get_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((kdirigasi, tahun)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    yearly::get(&state, &TABLE, &kdirigasi, &tahun).await.map(Json)
}

/// `PUT /api/infrastuktur/4irigasikondisibaik/{kdirigasi}/{tahun}` — patch this and every later year.
///
/// # Errors
/// Returns 400 for bad input, 404 when nothing is in scope.
pub async fn put_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((kdirigasi, tahun)): Path<(String, String)>,
    headers: HeaderMap,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    yearly::put(&state, &TABLE, &kdirigasi, &tahun, &headers, &body).await.map(Json)
}

/// `DELETE /api/infrastuktur/4irigasikondisibaik/{kdirigasi}/{tahun}` — remove one network-year row.
///
/// # Errors
/// Returns 400 for bad segments, 404 when missing.
pub async fn delete_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((kdirigasi, tahun)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    yearly::delete(&state, &TABLE, &kdirigasi, &tahun).await.map(Json)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::previous_year;
    use crate::routes::testkit::send_json;
    use crate::state::testing::USERS_KEY;

    #[test]
    fn previous_year_falls_back_to_last_calendar_year() {
        assert_eq!(previous_year(Some(2024), 2026), 2023);
        assert_eq!(previous_year(Some(1), 2026), 2025);
        assert_eq!(previous_year(None, 2026), 2025);
    }

    #[tokio::test]
    async fn create_validates_codes() {
        let uri = "/api/infrastuktur/4irigasikondisibaik";
        let (status, body) = send_json(Method::POST, uri, Some(USERS_KEY), json!({"kdirigasi": 0})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "kdirigasi wajib angka > 0");

        let (_, body) = send_json(Method::POST, uri, Some(USERS_KEY), json!({"kdirigasi": 4})).await;
        assert_eq!(body["error"], "tahun wajib angka > 0");

        let (_, body) = send_json(
            Method::POST,
            uri,
            Some(USERS_KEY),
            json!({"kdirigasi": 4, "tahun": 2024, "kdkecamatan": "12345678901"}),
        )
        .await;
        assert_eq!(body["error"], "kdkecamatan wajib diisi (maks 10 karakter)");
    }

    #[tokio::test]
    async fn item_put_rejects_unknown_fields_only() {
        let (status, body) = send_json(
            Method::PUT,
            "/api/infrastuktur/4irigasikondisibaik/4/2024",
            Some(USERS_KEY),
            json!({"warna": "biru"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Tidak ada field data yang diupdate");
    }
}
