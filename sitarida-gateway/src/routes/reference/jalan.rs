//! Road segments (`tblruasjalan`), keyed by `noruas`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sitarida_core::{coerce, NumericMode, Patch};
use sitarida_store::{lookup, query, Criterion, Select};

use super::{found, key, Target};
use crate::{
    auth::AnyKey,
    body::JsonBody,
    error::{ApiError, Context},
    routes::{
        fields::{self, Field, Kind},
        insert_id, trimmed,
    },
    state::AppState,
};

const TABLE: &str = "tblruasjalan";
const COLUMNS: &str = "noruas, namaruasjalan, kdkecamatan, nmkecamatan, hotmix, lapenmakadam, lebarruas, \
    panjangruas, perkerasanbeton, tanahbelumtembus, telfordkerikil";
const ITEM_COLUMNS: &str = "a.noruas, a.namaruasjalan, a.kdkecamatan, \
    COALESCE(b.nmkecamatan, a.nmkecamatan) AS nmkecamatan, a.hotmix, a.lapenmakadam, a.lebarruas, \
    a.panjangruas, a.perkerasanbeton, a.tanahbelumtembus, a.telfordkerikil";
const ITEM_SOURCE: &str = "tblruasjalan a LEFT JOIN refkecamatan b ON a.kdkecamatan = b.kdkecamatan";
const INVALID: &str = "noruas tidak valid (harus integer > 0)";

const SURFACES: [&str; 7] = [
    "hotmix",
    "lapenmakadam",
    "lebarruas",
    "panjangruas",
    "perkerasanbeton",
    "tanahbelumtembus",
    "telfordkerikil",
];

const FIELDS: &[Field] = &[
    ("namaruasjalan", Kind::Text(255)),
    ("kdkecamatan", Kind::Text(10)),
    ("nmkecamatan", Kind::Text(100)),
    ("hotmix", Kind::Decimal),
    ("lapenmakadam", Kind::Decimal),
    ("lebarruas", Kind::Decimal),
    ("panjangruas", Kind::Decimal),
    ("perkerasanbeton", Kind::Decimal),
    ("tanahbelumtembus", Kind::Decimal),
    ("telfordkerikil", Kind::Decimal),
];

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub kdkecamatan: Option<String>,
    pub search: Option<String>,
}

fn item(noruas: i64) -> Select {
    Select::new(ITEM_COLUMNS, ITEM_SOURCE).filter(Criterion::eq("a.noruas", noruas))
}

/// `GET /api/ref-jalan` — segments by district then name.
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list(_: AnyKey, State(state): State<AppState>, Query(q): Query<ListQuery>) -> Result<Json<Value>, ApiError> {
    let search = trimmed(q.search.as_ref()).map(|s| {
        Criterion::Any(vec![
            Criterion::contains("namaruasjalan", s),
            Criterion::contains("kdkecamatan", s),
            Criterion::contains("nmkecamatan", s),
        ])
    });
    let select = Select::new(COLUMNS, TABLE)
        .filter_opt(trimmed(q.kdkecamatan.as_ref()).map(|k| Criterion::eq("kdkecamatan", k)))
        .filter_opt(search)
        .order_by("kdkecamatan ASC, namaruasjalan ASC, noruas ASC");
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context("Failed to fetch ruas jalan")?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/ref-jalan` — the district name is filled from `refkecamatan` when omitted.
///
/// # Errors
/// Returns 400 for bad fields, 409 on a duplicate.
pub async fn create(
    _: AnyKey,
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FALLBACK: &str = "Gagal menambahkan ruas jalan";
    let Some(nama) = coerce::opt_str(&b, "namaruasjalan").filter(|s| coerce::fits(s, 255)) else {
        return Err(ApiError::BadRequest("namaruasjalan wajib diisi (maks 255 karakter)".to_owned()));
    };
    let Some(kdkecamatan) = coerce::opt_str(&b, "kdkecamatan").filter(|s| coerce::fits(s, 10)) else {
        return Err(ApiError::BadRequest("kdkecamatan wajib diisi (maks 10 karakter)".to_owned()));
    };
    let nmkecamatan = coerce::opt_str(&b, "nmkecamatan");
    if nmkecamatan.as_deref().is_some_and(|s| !coerce::fits(s, 100)) {
        return Err(ApiError::BadRequest("nmkecamatan maksimal 100 karakter".to_owned()));
    }
    let mut patch = Patch::new();
    for col in SURFACES {
        patch.set_opt(col, coerce::opt_dec(&b, col)?);
    }
    let nmkecamatan = match nmkecamatan {
        Some(n) => Some(n),
        None => lookup::kecamatan_name(&state.pool, &kdkecamatan).await.context(FALLBACK)?,
    };
    patch
        .set("namaruasjalan", nama)
        .set("kdkecamatan", kdkecamatan)
        .set("nmkecamatan", nmkecamatan);

    let noruas = match query::insert(&state.pool, TABLE, &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => {
            return Err(ApiError::Conflict("Data duplikat (nilai unik sudah digunakan)".to_owned()))
        }
        Err(e) => return Err(e).context(FALLBACK),
    };
    tracing::info!(noruas, "road segment created");
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("noruas", noruas));
    let row = found(&state, &select, "Data tidak ditemukan".to_owned(), FALLBACK).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/ref-jalan/{id}` — the segment with its district name from `refkecamatan`.
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn get_item(_: AnyKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let noruas = key(&id, INVALID)?;
    found(&state, &item(noruas), "Data tidak ditemukan".to_owned(), "Gagal ambil data ruas jalan")
        .await
        .map(Json)
}

/// `PUT /api/ref-jalan/{id}` — partial update, then the joined row.
///
/// # Errors
/// Returns 400 for bad input, 404 when missing.
pub async fn put_item(
    _: AnyKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    const FALLBACK: &str = "Gagal update ruas jalan";
    let noruas = key(&id, INVALID)?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("Tidak ada field untuk diupdate".to_owned()));
    }
    let patch = fields::patch(&body.0, FIELDS)?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("Tidak ada field data yang diupdate".to_owned()));
    }
    Target { table: TABLE, key: "noruas", id: noruas, fallback: FALLBACK }
        .patch(&state, &patch, "Data tidak ditemukan", "Data duplikat (nilai unik sudah digunakan)")
        .await?;
    found(&state, &item(noruas), "Data tidak ditemukan".to_owned(), FALLBACK)
        .await
        .map(Json)
}

/// `DELETE /api/ref-jalan/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing, 409 while condition rows reference it.
pub async fn delete_item(_: AnyKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let noruas = key(&id, INVALID)?;
    Target { table: TABLE, key: "noruas", id: noruas, fallback: "Gagal menghapus data ruas jalan" }
        .remove(&state, "Data tidak ditemukan")
        .await?;
    Ok(Json(json!({ "message": "Data berhasil dihapus" })))
}
