//! Bridge inventory per year (`tbljembatan`).

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use sitarida_core::{coerce, Aksi, Kondisi, NumericMode, Patch};
use sitarida_store::{query, Criterion, Select};

use crate::{
    auth::AnyKey,
    body::{audit_username, now, JsonBody},
    error::{ApiError, Context},
    routes::{
        fields::{self, Kind},
        insert_id, trimmed,
        yearly::{self, KeyKind, YearRule, YearlyTable},
    },
    state::AppState,
};

const COLUMNS: &str = "id, kdkecamatan, nmkecamatan, jembatan_id, nama_jembatan, panjang_m, \
    tahun_bangun, kondisi, aktif, created_at, updated_at, tahun";

/// Item routes over `(jembatan_id, tahun)`.
pub const TABLE: YearlyTable = YearlyTable {
    table: "tbljembatan",
    key: "jembatan_id",
    key_label: "jembatan_id",
    key_kind: KeyKind::Big,
    year_rule: YearRule::Calendar,
    columns: COLUMNS,
    source: "tbljembatan",
    key_expr: "jembatan_id",
    tahun_expr: "tahun",
    fields: &[
        ("kdkecamatan", Kind::Big),
        ("nmkecamatan", Kind::Text(100)),
        ("nama_jembatan", Kind::Text(150)),
        ("panjang_m", Kind::Decimal),
        ("tahun_bangun", Kind::Year),
        ("kondisi", Kind::Kondisi),
        ("aktif", Kind::Flag),
    ],
    sample: Some(COLUMNS),
    mode: NumericMode::JsonSafe,
    fallback: [
        "Gagal mengambil data jembatan",
        "Gagal update data jembatan",
        "Gagal menghapus data jembatan",
    ],
};

/// Query string of the collection route.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Row id.
    pub id: Option<String>,
    /// Bridge id; alone it selects the latest row.
    pub jembatan_id: Option<String>,
    /// District code.
    pub kdkecamatan: Option<String>,
    /// Condition enum.
    pub kondisi: Option<String>,
    /// `true` keeps active rows, anything else inactive ones.
    pub aktif: Option<String>,
    /// Name or district text; digits also match the ids.
    pub search: Option<String>,
    /// Row cap, default 1000, at most 5000.
    pub limit: Option<String>,
}

fn kondisi_choices() -> String {
    Kondisi::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
}

/// `GET /api/infrastuktur/3jembatan` — one row by `?id`, the latest by `?jembatan_id`, or a filtered list.
///
/// # Errors
/// Returns 400 for malformed ids or condition, 404 for a missing single
/// row, 500 on database failure.
pub async fn list(_: AnyKey, State(state): State<AppState>, Query(q): Query<ListQuery>) -> Result<Json<Value>, ApiError> {
    const FALLBACK: &str = "Gagal mengambil data jembatan";
    let not_found = || ApiError::NotFound("Data tidak ditemukan".to_owned());

    if let Some(raw) = trimmed(q.id.as_ref()) {
        let id = coerce::parse_id(raw).ok_or_else(|| ApiError::BadRequest("id tidak valid".to_owned()))?;
        let select = Select::new(COLUMNS, "tbljembatan").filter(Criterion::eq("id", id));
        let row = query::fetch_optional(&state.pool, &select, NumericMode::JsonSafe)
            .await
            .context(FALLBACK)?
            .ok_or_else(not_found)?;
        return Ok(Json(row));
    }

    let kdkecamatan = trimmed(q.kdkecamatan.as_ref());
    let kondisi = trimmed(q.kondisi.as_ref());
    let search = trimmed(q.search.as_ref());
    let only_bridge = kdkecamatan.is_none() && kondisi.is_none() && search.is_none() && q.aktif.is_none();

    if let (Some(raw), true) = (trimmed(q.jembatan_id.as_ref()), only_bridge) {
        let jid = coerce::parse_id(raw).ok_or_else(|| ApiError::BadRequest("jembatan_id tidak valid".to_owned()))?;
        let select = Select::new(COLUMNS, "tbljembatan")
            .filter(Criterion::eq("jembatan_id", jid))
            .order_by("updated_at DESC, id DESC");
        let row = query::fetch_optional(&state.pool, &select, NumericMode::JsonSafe)
            .await
            .context(FALLBACK)?
            .ok_or_else(not_found)?;
        return Ok(Json(row));
    }

    let kondisi = match kondisi {
        Some(k) => Some(
            k.parse::<Kondisi>()
                .map_err(|_| ApiError::BadRequest("kondisi tidak valid".to_owned()))?,
        ),
        None => None,
    };
    let search = search.map(|s| {
        let mut any = vec![
            Criterion::contains("nama_jembatan", s),
            Criterion::contains("nmkecamatan", s),
        ];
        if let Some(n) = coerce::parse_id(s).filter(|_| s.bytes().all(|b| b.is_ascii_digit())) {
            any.push(Criterion::eq("jembatan_id", n));
            any.push(Criterion::eq("kdkecamatan", n));
        }
        Criterion::Any(any)
    });
    let select = Select::new(COLUMNS, "tbljembatan")
        .filter_opt(
            trimmed(q.jembatan_id.as_ref())
                .and_then(coerce::parse_id)
                .map(|n| Criterion::eq("jembatan_id", n)),
        )
        .filter_opt(kdkecamatan.and_then(coerce::parse_id).map(|n| Criterion::eq("kdkecamatan", n)))
        .filter_opt(kondisi.map(|k| Criterion::eq("kondisi", k.as_str())))
        .filter_opt(
            q.aktif
                .as_deref()
                .map(|a| Criterion::eq("aktif", a.trim().eq_ignore_ascii_case("true"))),
        )
        .filter_opt(search)
        .order_by("updated_at DESC, id DESC")
        .limit(coerce::clamp_limit(q.limit.as_deref(), 1000, 5000));
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(FALLBACK)?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/infrastuktur/3jembatan` — add a bridge-year row.
///
/// # Errors
/// Returns 400 on validation failure, 409 on a unique-key clash, 500 on
/// database failure.
pub async fn create(
    _: AnyKey,
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FALLBACK: &str = "Gagal membuat data jembatan";
    let bad = |m: &str| ApiError::BadRequest(m.to_owned());

    let kdkecamatan = coerce::field(&b, "kdkecamatan")
        .and_then(coerce::to_big)
        .ok_or_else(|| bad("kdkecamatan wajib BigInt > 0"))?;
    let jembatan_id = coerce::field(&b, "jembatan_id")
        .and_then(coerce::to_big)
        .ok_or_else(|| bad("jembatan_id wajib BigInt > 0"))?;
    let nama = coerce::opt_str(&b, "nama_jembatan").ok_or_else(|| bad("nama_jembatan wajib diisi"))?;
    if !coerce::fits(&nama, 150) {
        return Err(bad("nama_jembatan maksimal 150 karakter"));
    }
    let kondisi = coerce::opt_str(&b, "kondisi").ok_or_else(|| bad("kondisi wajib diisi"))?;
    let kondisi = kondisi.parse::<Kondisi>().map_err(|_| {
        ApiError::BadRequest(format!("kondisi tidak valid. Pilih salah satu: {}", kondisi_choices()))
    })?;
    let tahun = coerce::field(&b, "tahun")
        .and_then(coerce::to_int)
        .filter(|t| (1000..=9999).contains(t))
        .ok_or_else(|| bad("tahun wajib 4 digit (mis. 2025)"))?;
    let tahun_bangun = fields::read(&b, "tahun_bangun", Kind::Year)?;
    let aktif = b
        .get("aktif")
        .filter(|v| !v.is_null())
        .map_or(true, |v| coerce::to_flag(v) == Some(true));

    let mut patch = Patch::new();
    patch
        .set("kdkecamatan", kdkecamatan)
        .set_opt("nmkecamatan", coerce::opt_str(&b, "nmkecamatan"))
        .set("jembatan_id", jembatan_id)
        .set("nama_jembatan", nama)
        .set_opt("panjang_m", coerce::opt_dec(&b, "panjang_m")?)
        .set_opt("tahun_bangun", tahun_bangun)
        .set("kondisi", kondisi.as_str())
        .set("aktif", aktif)
        .set("tahun", tahun);
    patch.audit(audit_username(&b, &headers), Aksi::Create, now());

    let id = match query::insert(&state.pool, "tbljembatan", &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => {
            return Err(ApiError::Conflict("Data duplikat (constraint unik terlanggar)".to_owned()))
        }
        Err(e) => return Err(e).context(FALLBACK),
    };
    tracing::info!(jembatan_id, tahun, id, "bridge row created");

    let select = Select::new(COLUMNS, "tbljembatan").filter(Criterion::eq("id", id));
    let row = query::fetch_one(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(FALLBACK)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/infrastuktur/3jembatan/{kdjembatan}/{tahun}` — one bridge-year row.
///
/// # Errors
/// Returns 400 for bad segments, 404 when missing.
pub async fn get_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((kdjembatan, tahun)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    yearly::get(&state, &TABLE, &kdjembatan, &tahun).await.map(Json)
}

/// `PUT /api/infrastuktur/3jembatan/{kdjembatan}/{tahun}` — patch this and every later year.
///
/// # Errors
/// Returns 400 for bad input, 404 when nothing is in scope.
pub async fn put_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((kdjembatan, tahun)): Path<(String, String)>,
    headers: HeaderMap,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    yearly::put(&state, &TABLE, &kdjembatan, &tahun, &headers, &body).await.map(Json)
}

/// `DELETE /api/infrastuktur/3jembatan/{kdjembatan}/{tahun}` — remove one bridge-year row.
///
/// # Errors
/// Returns 400 for bad segments, 404 when missing.
pub async fn delete_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((kdjembatan, tahun)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    yearly::delete(&state, &TABLE, &kdjembatan, &tahun).await.map(Json)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::kondisi_choices;
    use crate::routes::testkit::{send, send_json};
    use crate::state::testing::USERS_KEY;

    const URI: &str = "/api/infrastuktur/3jembatan";

    async fn post(body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        send_json(Method::POST, URI, Some(USERS_KEY), body).await
    }

    #[tokio::test]
    async fn create_validates_in_order() {
        let (status, body) = post(json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "kdkecamatan wajib BigInt > 0");

        let (_, body) = post(json!({"kdkecamatan": "7"})).await;
        assert_eq!(body["error"], "jembatan_id wajib BigInt > 0");

        let (_, body) = post(json!({"kdkecamatan": 7, "jembatan_id": "15"})).await;
        assert_eq!(body["error"], "nama_jembatan wajib diisi");

        let (_, body) = post(json!({"kdkecamatan": 7, "jembatan_id": 15, "nama_jembatan": "A"})).await;
        assert_eq!(body["error"], "kondisi wajib diisi");
    }

    #[tokio::test]
    async fn create_lists_valid_conditions() {
        let (status, body) = post(json!({
            "kdkecamatan": 7, "jembatan_id": 15, "nama_jembatan": "A", "kondisi": "LUMAYAN"
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            format!("kondisi tidak valid. Pilih salah satu: {}", kondisi_choices())
        );
    }

    #[tokio::test]
    async fn create_requires_four_digit_years() {
        let base = json!({
            "kdkecamatan": 7, "jembatan_id": 15, "nama_jembatan": "A", "kondisi": "BAIK", "tahun": 25
        });
        let (_, body) = post(base).await;
        assert_eq!(body["error"], "tahun wajib 4 digit (mis. 2025)");

        let (_, body) = post(json!({
            "kdkecamatan": 7, "jembatan_id": 15, "nama_jembatan": "A", "kondisi": "BAIK",
            "tahun": 2025, "tahun_bangun": 99
        }))
        .await;
        assert_eq!(body["error"], "tahun_bangun harus 4 digit (mis. 2015)");
    }

    #[tokio::test]
    async fn list_rejects_unknown_condition() {
        let (status, body) = send(Method::GET, "/api/infrastuktur/3jembatan?kondisi=X", Some(USERS_KEY)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "kondisi tidak valid");
    }

    #[tokio::test]
    async fn list_rejects_bad_id() {
        let (status, body) = send(Method::GET, "/api/infrastuktur/3jembatan?id=abc", Some(USERS_KEY)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "id tidak valid");
    }

    #[tokio::test]
    async fn item_year_must_be_a_calendar_year() {
        let (status, _) = send(Method::GET, "/api/infrastuktur/3jembatan/15/1800", Some(USERS_KEY)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
