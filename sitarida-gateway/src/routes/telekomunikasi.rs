//! Villages covered by telecommunication signal (`tblikucakupantelekomunikasi`).

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use sitarida_core::{coerce, Aksi, NumericMode, Patch};
use sitarida_store::{query, Criterion, Select};

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

const COLUMNS: &str = "id, kdtelekomunikasi, tahun, totaldesa, desaterlayani, username, aksi, datecreate";
const FALLBACK: &str = "Gagal mengambil data telekomunikasi";

pub const TABLE: YearlyTable = YearlyTable {
    table: "tblikucakupantelekomunikasi",
    key: "kdtelekomunikasi",
    key_label: "kdtelekomunikasi",
    key_kind: KeyKind::Text,
    year_rule: YearRule::Calendar,
    columns: COLUMNS,
    source: "tblikucakupantelekomunikasi",
    key_expr: "kdtelekomunikasi",
    tahun_expr: "tahun",
    fields: &[("totaldesa", Kind::Int), ("desaterlayani", Kind::Int)],
    sample: None,
    mode: NumericMode::Numbers,
    fallback: [FALLBACK, "Gagal update data telekomunikasi", "Gagal menghapus data telekomunikasi"],
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub id: Option<String>,
    pub tahun: Option<String>,
}

/// `GET /api/infrastuktur/7telekomunikasi` — one row by `?id`, or the list for `?tahun`.
///
/// # Errors
/// Returns 404 for a missing id, 500 on database failure.
pub async fn list(_: AnyKey, State(state): State<AppState>, Query(q): Query<ListQuery>) -> Result<Json<Value>, ApiError> {
    if let Some(id) = trimmed(q.id.as_ref()).and_then(coerce::parse_id) {
        let select = Select::new(COLUMNS, TABLE.table).filter(Criterion::eq("id", id));
        return query::fetch_optional(&state.pool, &select, NumericMode::JsonSafe)
            .await
            .context(FALLBACK)?
            .map(Json)
            .ok_or_else(|| ApiError::NotFound("Data tidak ditemukan".to_owned()));
    }
    let tahun = trimmed(q.tahun.as_ref()).and_then(coerce::parse_id);
    let select = Select::new(COLUMNS, TABLE.table)
        .filter_opt(tahun.map(|t| Criterion::eq("tahun", t)))
        .order_by("tahun DESC, id ASC")
        .limit(1000);
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(FALLBACK)?;
    Ok(Json(Value::Array(rows)))
}

fn count(b: &Value, key: &str) -> Result<i64, ApiError> {
    coerce::field(b, key)
        .and_then(coerce::to_int)
        .filter(|n| *n >= 0)
        .ok_or_else(|| ApiError::BadRequest(format!("{key} wajib angka >= 0")))
}

/// `POST /api/infrastuktur/7telekomunikasi` — record coverage for one year.
///
/// The body uses `total_desa` and `desa_terlayani`; `username` is required.
///
/// # Errors
/// Returns 400 on validation failure, 409 when the pair exists.
pub async fn create(
    _: AnyKey,
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const CREATE_FALLBACK: &str = "Gagal membuat data telekomunikasi";
    let Some(kd) = coerce::opt_str(&b, "kdtelekomunikasi") else {
        return Err(ApiError::BadRequest("kdtelekomunikasi wajib diisi".to_owned()));
    };
    let tahun = coerce::field(&b, "tahun")
        .and_then(coerce::to_int)
        .filter(|n| *n > 0)
        .ok_or_else(|| ApiError::BadRequest("tahun wajib angka > 0".to_owned()))?;
    let totaldesa = count(&b, "total_desa")?;
    let desaterlayani = count(&b, "desa_terlayani")?;
    let Some(username) = audit_username(&b, &headers) else {
        return Err(ApiError::BadRequest("username wajib diisi".to_owned()));
    };
    let aksi = coerce::opt_str(&b, "aksi")
        .and_then(|a| a.parse::<Aksi>().ok())
        .unwrap_or(Aksi::Create);

    let mut patch = Patch::new();
    patch
        .set("kdtelekomunikasi", kd.as_str())
        .set("tahun", tahun)
        .set("totaldesa", totaldesa)
        .set("desaterlayani", desaterlayani);
    patch.audit(Some(username), aksi, now());

    let id = match query::insert(&state.pool, TABLE.table, &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => {
            return Err(ApiError::Conflict(
                "Data telekomunikasi untuk kdtelekomunikasi+tahun sudah ada".to_owned(),
            ))
        }
        Err(e) => return Err(e).context(CREATE_FALLBACK),
    };
    tracing::info!(kdtelekomunikasi = %kd, tahun, id, "telecom coverage created");

    let select = Select::new(COLUMNS, TABLE.table).filter(Criterion::eq("id", id));
    let row = query::fetch_one(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(CREATE_FALLBACK)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/infrastuktur/7telekomunikasi/{kdtelekomunikasi}/{tahun}`
///
/// # Errors
/// Returns 400 for bad segments, 404 when missing.
pub async fn get_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((kd, tahun)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    yearly::get(&state, &TABLE, &kd, &tahun).await.map(Json)
}

/// `PUT /api/infrastuktur/7telekomunikasi/{kdtelekomunikasi}/{tahun}` — patch this and every later year.
///
/// # Errors
/// Returns 400 for bad input, 404 when nothing is in scope.
pub async fn put_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((kd, tahun)): Path<(String, String)>,
    headers: HeaderMap,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    yearly::put(&state, &TABLE, &kd, &tahun, &headers, &body).await.map(Json)
}

/// `DELETE /api/infrastuktur/7telekomunikasi/{kdtelekomunikasi}/{tahun}`
///
/// # Errors
/// Returns 400 for bad segments, 404 when missing.
pub async fn delete_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path((kd, tahun)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    yearly::delete(&state, &TABLE, &kd, &tahun).await.map(Json)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testkit::{send, send_json};
    use crate::state::testing::{ADMIN_KEY, USERS_KEY};

    #[tokio::test]
    async fn collection_needs_a_key() {
        let (status, body) = send(Method::GET, "/api/infrastuktur/7telekomunikasi", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Masukkan API KEY");
    }

    #[tokio::test]
    async fn create_checks_counts_then_username() {
        let uri = "/api/infrastuktur/7telekomunikasi";
        let base = json!({"kdtelekomunikasi": "T01", "tahun": 2024, "total_desa": 10, "desa_terlayani": -1});
        let (status, body) = send_json(Method::POST, uri, Some(USERS_KEY), base).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "desa_terlayani wajib angka >= 0");

        let body = json!({"kdtelekomunikasi": "T01", "tahun": 2024, "total_desa": 10, "desa_terlayani": 4});
        let (_, body) = send_json(Method::POST, uri, Some(ADMIN_KEY), body).await;
        assert_eq!(body["error"], "username wajib diisi");
    }

    #[tokio::test]
    async fn item_year_must_be_a_calendar_year() {
        let (status, _) = send(Method::GET, "/api/infrastuktur/7telekomunikasi/T01/1800", Some(USERS_KEY)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
