//! Dashboard user accounts (`user`), served under `/api/tbltargetdayasaing`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use sitarida_core::{coerce, NumericMode, Patch};
use sitarida_store::{query, Criterion, Select};

use crate::{
    auth::{hash_password, UsersKey},
    body::{now, JsonBody},
    error::{ApiError, Context},
    routes::{insert_id, reference::found, reference::kecamatan::SearchQuery, trimmed},
    state::AppState,
};

const TABLE: &str = "`user`";
const COLUMNS: &str = "id, username, nama, email, level, idgroup, createdAt";
const DEFAULT_LEVEL: i64 = 1;

/// `GET /api/tbltargetdayasaing` — newest first; `?search` over username, name and email.
///
/// # Errors
/// Returns 401 without the users key, 500 on database failure.
pub async fn list(_: UsersKey, State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Result<Json<Value>, ApiError> {
    let search = trimmed(q.search.as_ref()).map(|s| {
        Criterion::Any(vec![
            Criterion::contains("username", s),
            Criterion::contains("nama", s),
            Criterion::contains("email", s),
        ])
    });
    let select = Select::new(COLUMNS, TABLE).filter_opt(search).order_by("createdAt DESC");
    let rows = query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context("Failed to fetch users")?;
    Ok(Json(Value::Array(rows)))
}

/// `POST /api/tbltargetdayasaing`
///
/// # Errors
/// Returns 400 without name and email, 409 when the email is taken.
pub async fn create(
    _: UsersKey,
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FALLBACK: &str = "Failed to create user";
    let (Some(nama), Some(email)) = (coerce::opt_str(&b, "nama"), coerce::opt_str(&b, "email")) else {
        return Err(ApiError::BadRequest("nama & email are required".to_owned()));
    };
    let password = match coerce::opt_str(&b, "password") {
        Some(p) => Some(hash_password(p, state.config.salt_rounds).await?),
        None => None,
    };
    let mut patch = Patch::new();
    patch
        .set_opt("username", coerce::opt_str(&b, "username"))
        .set_opt("password", password)
        .set("nama", nama)
        .set("email", email)
        .set("level", coerce::opt_int(&b, "level")?.unwrap_or(DEFAULT_LEVEL))
        .set_opt("idgroup", coerce::opt_int(&b, "idgroup")?)
        .set("createdAt", now());
    let id = match query::insert(&state.pool, TABLE, &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => return Err(ApiError::Conflict("Email already exists".to_owned())),
        Err(e) => return Err(e).context(FALLBACK),
    };
    tracing::info!(id, "user created");
    let select = Select::new(COLUMNS, TABLE).filter(Criterion::eq("id", id));
    let row = found(&state, &select, "Not found".to_owned(), FALLBACK).await?;
    Ok((StatusCode::CREATED, Json(row)))
}
