//! Indicator (IKU) targets and the dashboard aggregations built on them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Map, Value};
use sitarida_core::{
    coerce,
    indicator::{kualitas_sdm_field, Pivot, AKIP_CODES, KESEJAHTERAAN, PERKAPITA},
    json_safe::numberish,
    NumericMode, Patch, SqlValue,
};
use sitarida_store::{indicator, query, Criterion, Select};

use crate::{
    auth::UsersKey,
    body::{now, JsonBody},
    error::{ApiError, Context},
    routes::{insert_id, reference::kecamatan::SearchQuery, trimmed},
    state::AppState,
};

const FETCH_FAILED: &str = "Gagal mengambil data";

/// Year pivot of `tbltargetindikator` for one dashboard.
pub(crate) async fn pivot(state: &AppState, p: &Pivot) -> Result<Json<Value>, ApiError> {
    let rows = indicator::target_rows(&state.pool, &p.codes())
        .await
        .context(FETCH_FAILED)
        .map_err(ApiError::message_keyed)?;
    Ok(Json(Value::Array(p.apply(&rows))))
}

fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── AKIP targets ────────────────────────────────────────────────

/// `GET /api/akip` — targets for the accountability indicators, oldest year first.
///
/// # Errors
/// Returns 500 `{success: false, message}` on database failure.
pub async fn akip(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let codes = AKIP_CODES.iter().map(|c| SqlValue::from(*c)).collect();
    let select = Select::new("kdiku, nmiku, tahun, target, satuan", "tbltargetindikator")
        .filter(Criterion::In("kdiku", codes))
        .order_by("tahun ASC");
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(FETCH_FAILED)
        .map_err(|e| e.reshape(|m| json!({ "success": false, "message": m })))?;
    Ok(Json(json!({ "success": true, "data": rows })))
}

/// `POST /api/akip`
///
/// # Errors
/// Returns 400 for missing or mistyped fields, 409 on a duplicate.
pub async fn create_akip(
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let string = |k: &str| b.get(k).and_then(Value::as_str);
    let scalar = |k: &str| b.get(k).filter(|v| v.is_string() || v.is_number());
    let (Some(kdiku), Some(nmiku), Some(satuan), Some(tahun), Some(target)) = (
        string("kdiku"),
        string("nmiku"),
        string("satuan"),
        scalar("tahun"),
        scalar("target"),
    ) else {
        return Err(ApiError::BadRequest(
            "Semua field wajib diisi dengan tipe yang benar".to_owned(),
        ));
    };
    let Some(tahun) = coerce::to_int(tahun) else {
        return Err(ApiError::BadRequest("tahun harus berupa angka".to_owned()));
    };
    let (kdiku, nmiku, satuan) = (kdiku.trim(), nmiku.trim(), satuan.trim());
    if kdiku.is_empty() || nmiku.is_empty() || satuan.is_empty() {
        return Err(ApiError::BadRequest("kdiku, nmiku, satuan tidak boleh kosong".to_owned()));
    }

    let mut patch = Patch::new();
    patch
        .set("kdiku", kdiku)
        .set("nmiku", nmiku)
        .set("tahun", tahun)
        .set("target", text(target))
        .set("satuan", satuan);
    match query::insert(&state.pool, "tbltargetindikator", &patch).await {
        Ok(_) => {}
        Err(e) if e.is_conflict() => {
            return Err(ApiError::Conflict("Data duplikat (nilai unik sudah digunakan)".to_owned()))
        }
        Err(e) => return Err(e).context("Gagal menambahkan data AKIP"),
    }
    tracing::info!(kdiku, tahun, "indicator target added");
    Ok((StatusCode::CREATED, Json(patch.to_json())))
}

// ── Human-resource quality lookups ──────────────────────────────

/// One `tblkualitassdm` row as `{tahun, <field>: nilai}`.
async fn kualitas_sdm(state: &AppState, raw: &str) -> Result<Json<Value>, ApiError> {
    let Some(id) = coerce::parse_id(raw) else {
        return Err(ApiError::BadRequest("ID tidak valid".to_owned()));
    };
    let select = Select::new("tahun, kdiku, nilai", "tblkualitassdm").filter(Criterion::eq("id_data", id));
    let Some(row) = query::fetch_optional(&state.pool, &select, NumericMode::Numbers)
        .await
        .context("Failed to fetch AKIP")?
    else {
        return Err(ApiError::NotFound("Data tidak ditemukan".to_owned()));
    };
    let mut out = Map::new();
    out.insert("tahun".to_owned(), Value::String(text(&row["tahun"])));
    if let Some(field) = kualitas_sdm_field(&text(&row["kdiku"])) {
        out.insert(field.to_owned(), numberish(row["nilai"].clone()));
    }
    Ok(Json(Value::Object(out)))
}

/// `GET /api/akip/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn akip_item(_: UsersKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    kualitas_sdm(&state, &id).await
}

/// `GET /api/capaianrtlh/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn capaian_rtlh_item(
    _: UsersKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    kualitas_sdm(&state, &id).await
}

/// `GET /api/lingkunganhidup/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn lingkungan_hidup_item(
    _: UsersKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    kualitas_sdm(&state, &id).await
}

// ── Aggregations ────────────────────────────────────────────────

async fn aggregate(state: &AppState, sql: &'static str) -> Result<Json<Value>, ApiError> {
    let rows = indicator::run(&state.pool, sql, NumericMode::Numbers)
        .await
        .context(FETCH_FAILED)
        .map_err(ApiError::message_keyed)?;
    Ok(Json(Value::Array(rows)))
}

/// `GET /api/kualitassdm`
///
/// # Errors
/// Returns 500 on database failure.
pub async fn kualitas_sdm_summary(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    aggregate(&state, indicator::KUALITAS_SDM_SQL).await
}

/// `GET /api/lingkunganhidup`
///
/// # Errors
/// Returns 500 on database failure.
pub async fn lingkungan_hidup(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    aggregate(&state, indicator::LINGKUNGAN_HIDUP_SQL).await
}

/// `GET /api/rtlh` — uninhabitable housing per district.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn rtlh(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    aggregate(&state, indicator::RTLH_SQL).await
}

/// `GET /api/capaianrtlh`
///
/// # Errors
/// Returns 500 on database failure.
pub async fn capaian_rtlh(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rows = indicator::capaian_rtlh(&state.pool)
        .await
        .context(FETCH_FAILED)
        .map_err(ApiError::message_keyed)?;
    Ok(Json(Value::Array(rows)))
}

/// `GET /api/infrastuktur` — the composite infrastructure table.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn infrastruktur(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rows = indicator::infrastruktur(&state.pool)
        .await
        .context(FETCH_FAILED)
        .map_err(ApiError::message_keyed)?;
    Ok(Json(Value::Array(rows)))
}

/// `GET /api/kesejahteraanmasyarakat`
///
/// # Errors
/// Returns 500 on database failure.
pub async fn kesejahteraan(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    pivot(&state, &KESEJAHTERAAN).await
}

/// `GET /api/perkapita`
///
/// # Errors
/// Returns 500 on database failure.
pub async fn perkapita(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    pivot(&state, &PERKAPITA).await
}

// ── Competitiveness index ───────────────────────────────────────

const DAYA_SAING: &str = "tbltargetdayasaing";

/// `GET /api/indexdayasaing`
///
/// # Errors
/// Returns 500 `{message}` on database failure.
pub async fn index_daya_saing(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rows = indicator::index_daya_saing(&state.pool)
        .await
        .context(FETCH_FAILED)
        .map_err(ApiError::message_keyed)?;
    Ok(Json(Value::Array(rows)))
}

fn numeric(v: &Value) -> Option<SqlValue> {
    coerce::to_dec(v).ok().flatten().map(SqlValue::from)
}

/// `POST /api/indexdayasaing`
///
/// # Errors
/// Returns 400 `{message}` for a bad body, 500 on database failure.
pub async fn create_index_daya_saing(
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let string = |k: &str| b.get(k).and_then(Value::as_str);
    let (Some(indikator), Some(kdiku), Some(nmiku), Some(id), Some(tahun), Some(target), Some(capaian)) = (
        string("indikator"),
        string("kdiku"),
        string("nmiku"),
        b.get("id").and_then(coerce::to_str),
        b.get("tahun"),
        b.get("target"),
        b.get("capaian"),
    ) else {
        return Err(ApiError::BadRequest(
            "Body tidak valid. Wajib { id, indikator, kdiku, nmiku, tahun, target, capaian }".to_owned(),
        )
        .message_keyed());
    };
    let (Some(tahun), Some(target), Some(capaian)) = (coerce::to_int(tahun), numeric(target), numeric(capaian)) else {
        return Err(ApiError::BadRequest("tahun/target/capaian harus numerik.".to_owned()).message_keyed());
    };

    let mut patch = Patch::new();
    patch
        .set("iddys", id)
        .set("nmdys", indikator)
        .set("kdiku", kdiku)
        .set("nmiku", nmiku)
        .set("tahun", tahun)
        .set("target", target)
        .set("capaian", capaian);
    query::insert(&state.pool, DAYA_SAING, &patch)
        .await
        .context("Gagal menambahkan data. Periksa log server.")
        .map_err(ApiError::message_keyed)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Data berhasil ditambahkan", "data": patch.to_json() })),
    ))
}

/// `PUT /api/indexdayasaing` and `PUT /api/indexdayasaing/{id}`: updates
/// target and/or capaian of the `(kdiku, tahun)` row. The path id is ignored.
///
/// # Errors
/// Returns 400 `{message}` for a bad body, 404 when no row matches.
pub async fn put_index_daya_saing(State(state): State<AppState>, JsonBody(b): JsonBody) -> Result<Json<Value>, ApiError> {
    update_index_daya_saing(&state, &b).await.map_err(ApiError::message_keyed)
}

async fn update_index_daya_saing(state: &AppState, b: &Value) -> Result<Json<Value>, ApiError> {
    const FALLBACK: &str = "Gagal memperbarui data. Periksa log server.";
    let (Some(kdiku), Some(tahun)) = (b.get("kdiku").and_then(Value::as_str), b.get("tahun")) else {
        return Err(ApiError::BadRequest("Body tidak valid. Minimal { kdiku, tahun }".to_owned()));
    };
    let Some(tahun) = coerce::to_int(tahun) else {
        return Err(ApiError::BadRequest("tahun harus numerik.".to_owned()));
    };
    let mut patch = Patch::new();
    for col in ["target", "capaian"] {
        if let Some(raw) = coerce::field(b, col) {
            let Some(v) = numeric(raw) else {
                return Err(ApiError::BadRequest(format!("{col} harus numerik.")));
            };
            patch.set(col, v);
        }
    }
    if patch.is_empty() {
        return Err(ApiError::BadRequest(
            "Tidak ada field yang diperbarui. Sertakan 'target' atau 'capaian'.".to_owned(),
        ));
    }

    let scope = [Criterion::eq("kdiku", kdiku), Criterion::eq("tahun", tahun)];
    if !query::exists(&state.pool, DAYA_SAING, &scope).await.context(FALLBACK)? {
        return Err(ApiError::NotFound("Data tidak ditemukan.".to_owned()));
    }
    query::update(&state.pool, DAYA_SAING, &patch, &scope).await.context(FALLBACK)?;
    let select = Select::new("*", DAYA_SAING)
        .filter(Criterion::eq("kdiku", kdiku))
        .filter(Criterion::eq("tahun", tahun));
    let data = query::fetch_one(&state.pool, &select, NumericMode::Numbers)
        .await
        .context(FALLBACK)?;
    tracing::info!(kdiku, tahun, "competitiveness index updated");
    Ok(Json(json!({ "message": "Data berhasil diperbarui", "data": data })))
}

// ── Accountability scores ───────────────────────────────────────

/// `GET /api/tblakip` — `?search` over indicator, reform grade, code, year and scores.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn tblakip(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Result<Json<Value>, ApiError> {
    let search = trimmed(q.search.as_ref()).map(|s| {
        let mut any = vec![Criterion::contains("indikator", s), Criterion::contains("reformasi", s)];
        if let Ok(n) = s.parse::<i64>() {
            any.push(Criterion::eq("kodesasaran", n));
            any.push(Criterion::eq("tahun", n));
        }
        if let Ok(f) = s.parse::<f64>() {
            any.push(Criterion::eq("spi", f));
            any.push(Criterion::eq("sakip", f));
        }
        Criterion::Any(any)
    });
    let select = Select::new("*", "tblakip").filter_opt(search).order_by("kodesasaran ASC");
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context("Gagal mengambil data tblakip")?;
    Ok(Json(Value::Array(rows)))
}

fn created_at(b: &Value) -> Result<chrono::NaiveDateTime, ApiError> {
    let Some(raw) = coerce::opt_str(b, "createdAt") else {
        return Ok(now());
    };
    chrono::DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.naive_utc())
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|_| ApiError::BadRequest("createdAt tidak valid".to_owned()))
}

/// `POST /api/tblakip`
///
/// # Errors
/// Returns 400 for a missing code or indicator, a non-numeric code, or a code in use.
pub async fn create_tblakip(
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(kode), Some(indikator)) = (coerce::field(&b, "kodesasaran"), coerce::opt_str(&b, "indikator")) else {
        return Err(ApiError::BadRequest("Harus mengisi kode sasaran dan indikator".to_owned()));
    };
    let Some(kodesasaran) = coerce::to_int(kode) else {
        return Err(ApiError::BadRequest("kode sasaran harus berupa angka".to_owned()));
    };
    let mut patch = Patch::new();
    patch
        .set("kodesasaran", kodesasaran)
        .set("indikator", indikator)
        .set_opt("tahun", coerce::opt_int(&b, "tahun")?)
        .set_opt("reformasi", coerce::opt_str(&b, "reformasi"))
        .set_opt("spi", coerce::opt_dec(&b, "spi")?)
        .set_opt("sakip", coerce::opt_dec(&b, "sakip")?)
        .set("createdAt", created_at(&b)?);
    let id = match query::insert(&state.pool, "tblakip", &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => return Err(ApiError::BadRequest("Kode sasaran sudah digunakan".to_owned())),
        Err(e) => return Err(e).context("Gagal menambahkan data akip"),
    };
    tracing::info!(id, kodesasaran, "accountability score added");
    let mut row = patch.to_json();
    if let Value::Object(map) = &mut row {
        map.insert("id".to_owned(), json!(id));
    }
    Ok((StatusCode::CREATED, Json(row)))
}
