//! Road condition per segment and year (`tbljalankondisi`).

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use sitarida_core::{coerce, Aksi, NumericMode, Patch};
use sitarida_store::{lookup, query, Criterion, Select};

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

const LIST_COLUMNS: &str = "jk.noruas, rj.namaruasjalan, rj.kdkecamatan AS kdkecamatan, \
    rk.nmkecamatan AS namakecamatan, jk.tahun, jk.kondisibaik, jk.kondisisedang, \
    jk.kondisirusakringan, jk.kondisirusakberat, jk.lhr, jk.akses";

const LIST_SOURCE: &str = "tbljalankondisi AS jk \
    LEFT JOIN tblruasjalan AS rj ON rj.noruas = jk.noruas \
    LEFT JOIN refkecamatan AS rk ON rk.kdkecamatan = rj.kdkecamatan";

const ROW_COLUMNS: &str = "id, noruas, namaruasjalan, kdkecamatan, nmkecamatan, tahun, kondisibaik, \
    kondisisedang, kondisirusakringan, kondisirusakberat, lhr, akses, verif, datecreate, username, aksi";

const DECIMALS: [&str; 4] = ["kondisibaik", "kondisisedang", "kondisirusakringan", "kondisirusakberat"];

/// Item routes over `(noruas, tahun)`.
pub const TABLE: YearlyTable = YearlyTable {
    table: "tbljalankondisi",
    key: "noruas",
    key_label: "noruas",
    key_kind: KeyKind::Int,
    year_rule: YearRule::Positive,
    columns: "noruas, namaruasjalan, tahun, kdkecamatan, nmkecamatan, kondisibaik, kondisisedang, \
        kondisirusakringan, kondisirusakberat, lhr, akses, verif, username, aksi, datecreate",
    source: "tbljalankondisi",
    key_expr: "noruas",
    tahun_expr: "tahun",
    fields: &[
        ("kdkecamatan", Kind::Text(10)),
        ("namaruasjalan", Kind::Text(255)),
        ("nmkecamatan", Kind::Text(100)),
        ("kondisibaik", Kind::Decimal),
        ("kondisisedang", Kind::Decimal),
        ("kondisirusakringan", Kind::Decimal),
        ("kondisirusakberat", Kind::Decimal),
        ("lhr", Kind::Int),
        ("akses", Kind::Text(255)),
        ("verif", Kind::Flag),
    ],
    sample: None,
    mode: NumericMode::JsonSafe,
    fallback: [
        "Gagal mengambil data jalan kondisi",
        "Gagal update data jalan kondisi",
        "Gagal menghapus data jalan kondisi",
    ],
};

/// Query string of the collection route.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Single segment lookup.
    pub noruas: Option<String>,
    /// Name, district or access text; numeric values also match `noruas`.
    pub search: Option<String>,
    /// Restrict to one year.
    pub tahun: Option<String>,
    /// Row cap, default 1000, at most 5000.
    pub limit: Option<String>,
}

/// `GET /api/infrastuktur/2jalanmantap` — list conditions, or one segment with `?noruas`.
///
/// # Errors
/// Returns 404 when `?noruas` matches nothing, 500 on database failure.
pub async fn list(_: AnyKey, State(state): State<AppState>, Query(q): Query<ListQuery>) -> Result<Json<Value>, ApiError> {
    const FALLBACK: &str = "Gagal menampilkan data jalan kondisi";
    if let Some(noruas) = trimmed(q.noruas.as_ref()).and_then(coerce::parse_id) {
        let select = Select::new(LIST_COLUMNS, LIST_SOURCE)
            .filter(Criterion::eq("jk.noruas", noruas))
            .order_by("jk.tahun DESC");
        let row = query::fetch_optional(&state.pool, &select, NumericMode::JsonSafe)
            .await
            .context(FALLBACK)?
            .ok_or_else(|| ApiError::NotFound("Data tidak ditemukan".to_owned()))?;
        return Ok(Json(row));
    }

    let search = trimmed(q.search.as_ref()).map(|s| {
        let mut any = vec![
            Criterion::contains("rj.namaruasjalan", s),
            Criterion::contains("rk.nmkecamatan", s),
            Criterion::contains("jk.akses", s),
        ];
        if let Ok(n) = s.parse::<i64>() {
            any.push(Criterion::eq("jk.noruas", n));
        }
        Criterion::Any(any)
    });
    let tahun = trimmed(q.tahun.as_ref())
        .and_then(coerce::parse_id)
        .map(|t| Criterion::eq("jk.tahun", t));
    let select = Select::new(LIST_COLUMNS, LIST_SOURCE)
        .filter_opt(search)
        .filter_opt(tahun)
        .order_by("jk.noruas DESC, jk.tahun DESC")
        .limit(coerce::clamp_limit(q.limit.as_deref(), 1000, 5000));
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(FALLBACK)?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/infrastuktur/2jalanmantap` — record a segment's condition for one year.
///
/// District code, district name and segment name are backfilled from the
/// segment and district references when omitted.
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
    const FALLBACK: &str = "Gagal membuat data jalan kondisi";
    let tahun = coerce::field(&b, "tahun")
        .and_then(coerce::to_int)
        .filter(|t| *t > 0)
        .ok_or_else(|| ApiError::BadRequest("tahun wajib integer > 0".to_owned()))?;
    let noruas = coerce::field(&b, "noruas")
        .and_then(coerce::to_int)
        .filter(|n| *n > 0)
        .ok_or_else(|| ApiError::BadRequest("noruas wajib integer > 0".to_owned()))?;

    let mut kdkecamatan = coerce::opt_str(&b, "kdkecamatan");
    let mut nmkecamatan = coerce::opt_str(&b, "nmkecamatan");
    let mut namaruasjalan = coerce::opt_str(&b, "namaruasjalan");

    if kdkecamatan.is_none() {
        let ruas = lookup::ruas(&state.pool, noruas).await.context(FALLBACK)?;
        let Some(ruas) = ruas.filter(|r| r.kdkecamatan.is_some()) else {
            return Err(ApiError::BadRequest(
                "kdkecamatan tidak dikirim dan tidak ditemukan pada tblruasjalan".to_owned(),
            ));
        };
        kdkecamatan = ruas.kdkecamatan;
        nmkecamatan = nmkecamatan.or(ruas.nmkecamatan);
        namaruasjalan = namaruasjalan.or(ruas.namaruasjalan);
    }

    let Some(kdkecamatan) = kdkecamatan.filter(|k| coerce::fits(k, 10)) else {
        return Err(ApiError::BadRequest("kdkecamatan wajib diisi (maks 10 karakter)".to_owned()));
    };
    if nmkecamatan.as_deref().is_some_and(|n| !coerce::fits(n, 100)) {
        return Err(ApiError::BadRequest("nmkecamatan maksimal 100 karakter".to_owned()));
    }
    if namaruasjalan.as_deref().is_some_and(|n| !coerce::fits(n, 255)) {
        return Err(ApiError::BadRequest("namaruasjalan maksimal 255 karakter".to_owned()));
    }
    if nmkecamatan.is_none() {
        nmkecamatan = lookup::kecamatan_name(&state.pool, &kdkecamatan).await.context(FALLBACK)?;
    }

    let mut patch = Patch::new();
    patch
        .set("noruas", noruas)
        .set_opt("namaruasjalan", namaruasjalan)
        .set("kdkecamatan", kdkecamatan)
        .set_opt("nmkecamatan", nmkecamatan)
        .set("tahun", tahun);
    for col in DECIMALS {
        patch.set_opt(col, coerce::opt_dec(&b, col)?);
    }
    patch
        .set_opt("lhr", coerce::opt_int(&b, "lhr")?)
        .set_opt("akses", coerce::opt_str(&b, "akses"))
        .set_opt("verif", b.get("verif").filter(|v| !v.is_null()).map(|v| coerce::to_flag(v) == Some(true)));
    patch.audit(audit_username(&b, &headers), Aksi::Create, now());

    let pair = [Criterion::eq("noruas", noruas), Criterion::eq("tahun", tahun)];
    if query::exists(&state.pool, "tbljalankondisi", &pair).await.context(FALLBACK)? {
        return Err(ApiError::Conflict(format!(
            "Data untuk noruas={noruas} dan tahun={tahun} sudah ada"
        )));
    }

    let id = match query::insert(&state.pool, "tbljalankondisi", &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => {
            return Err(ApiError::Conflict("Data duplikat (constraint unik terlanggar)".to_owned()))
        }
        Err(e) => return Err(e).context(FALLBACK),
    };
    tracing::info!(noruas, tahun, id, "road condition created");

    let select = Select::new(ROW_COLUMNS, "tbljalankondisi").filter(Criterion::eq("id", id));
    let row = query::fetch_one(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(FALLBACK)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/infrastuktur/2jalanmantap/{noruas}/{tahun}` — one segment-year row.
///
/// # Errors
/// Returns 400 for bad segments, 404 when missing.
pub async fn get_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((noruas, tahun)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    yearly::get(&state, &TABLE, &noruas, &tahun).await.map(Json)
}

/// `PUT /api/infrastuktur/2jalanmantap/{noruas}/{tahun}` — patch this and every later year.
///
/// # Errors
/// Returns 400 for bad input, 404 when nothing is in scope.
pub async fn put_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((noruas, tahun)): Path<(String, String)>,
    headers: HeaderMap,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    yearly::put(&state, &TABLE, &noruas, &tahun, &headers, &body).await.map(Json)
}

/// `DELETE /api/infrastuktur/2jalanmantap/{noruas}/{tahun}` — remove one segment-year row.
///
/// # Errors
/// Returns 400 for bad segments, 404 when missing.
pub async fn delete_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((noruas, tahun)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    yearly::delete(&state, &TABLE, &noruas, &tahun).await.map(Json)
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use crate::routes::testkit::{send, send_json};
    use crate::state::testing::ADMIN_KEY;

    #[tokio::test]
    async fn list_requires_a_key() {
        let (status, body) = send(Method::GET, "/api/infrastuktur/2jalanmantap", None).await;
        assert_eq!(status, axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Masukkan API KEY"}));
    }

    #[tokio::test]
    async fn create_rejects_missing_year() {
        let (status, body) = send_json(
            Method::POST,
            "/api/infrastuktur/2jalanmantap",
            Some(ADMIN_KEY),
            json!({"noruas": 12}),
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "tahun wajib integer > 0");
    }

    #[tokio::test]
    async fn create_rejects_bad_noruas() {
        let (status, body) = send_json(
            Method::POST,
            "/api/infrastuktur/2jalanmantap",
            Some(ADMIN_KEY),
            json!({"tahun": 2024, "noruas": "abc"}),
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "noruas wajib integer > 0");
    }

    #[tokio::test]
    async fn item_put_rejects_empty_body() {
        let (status, body) = send_json(
            Method::PUT,
            "/api/infrastuktur/2jalanmantap/12/2024",
            Some(ADMIN_KEY),
            json!({}),
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Tidak ada field untuk diupdate");
    }

    #[tokio::test]
    async fn item_put_rejects_audit_only_body() {
        let (status, body) = send_json(
            Method::PUT,
            "/api/infrastuktur/2jalanmantap/12/2024",
            Some(ADMIN_KEY),
            json!({"username": "budi"}),
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Tidak ada field data yang diupdate");
    }

    #[tokio::test]
    async fn item_rejects_bad_year_segment() {
        let (status, body) = send(Method::GET, "/api/infrastuktur/2jalanmantap/12/xx", Some(ADMIN_KEY)).await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "tahun tidak valid");
    }
}
