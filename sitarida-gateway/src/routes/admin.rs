//! Administrator accounts (`admin`) and session sign-in.
//!
//! `/login` and `/login/{id}` manage accounts behind API keys; `/admin` does
//! the same behind a session token. `/auth/login` checks a password against
//! the stored bcrypt hash and hands out a one-hour token, both in the body
//! and as an HttpOnly cookie.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    Json,
};
use serde_json::{json, Map, Value};
use sitarida_core::{coerce, Level, LockStatus, NumericMode, Patch};
use sitarida_store::{query, Criterion, Select};

use crate::{
    auth::{cleared_cookie, hash_password, session_cookie, sign_token, verify_password, AnyKey, Claims, UsersKey},
    body::{now, JsonBody},
    error::{ApiError, Context},
    routes::{
        fields::{self, Field, Kind},
        insert_id,
        reference::{found, key, Target},
    },
    state::AppState,
};

const TABLE: &str = "admin";
const SAFE_COLUMNS: &str = "id, username, nmpengguna, nipid, kdopd, nmopd, level, datecreate, lockuser";
const LIST_COLUMNS: &str = "a.id, a.nipid, a.nmpengguna, a.username, a.kdopd, b.nmopd, a.level, a.datecreate, a.lockuser";
const LIST_SOURCE: &str = "admin a INNER JOIN refopd b ON a.kdopd = b.kdopd";
const NOT_FOUND: &str = "Not found";

/// Columns an account update may touch besides the password.
const FIELDS: &[Field] = &[
    ("nipid", Kind::Text(50)),
    ("nmpengguna", Kind::Text(255)),
    ("username", Kind::Text(100)),
    ("kdopd", Kind::Text(20)),
    ("nmopd", Kind::Text(255)),
    ("level", Kind::Level),
    ("lockuser", Kind::Lock),
];

/// bcrypt reads at most 72 bytes of input.
const PASSWORD_BYTES: std::ops::RangeInclusive<usize> = 2..=72;

fn password_fits(password: &str) -> bool {
    PASSWORD_BYTES.contains(&password.len())
}

fn by_id(id: i64) -> Select {
    Select::new(SAFE_COLUMNS, TABLE).filter(Criterion::eq("id", id))
}

// ── Shared account operations ───────────────────────────────────

async fn list_accounts(state: &AppState) -> Result<Json<Value>, ApiError> {
    let select = Select::new(LIST_COLUMNS, LIST_SOURCE).order_by("a.datecreate DESC");
    let rows = query::fetch_all(&state.pool, &select, NumericMode::Numbers)
        .await
        .context("Gagal mengambil data")
        .map_err(ApiError::message_keyed)?;
    Ok(Json(Value::Array(rows)))
}

async fn register(state: &AppState, b: &Value) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FALLBACK: &str = "Failed to create admin";
    let (Some(username), Some(password), Some(nmpengguna)) = (
        coerce::opt_str(b, "username"),
        coerce::opt_str(b, "password"),
        coerce::opt_str(b, "nmpengguna"),
    ) else {
        return Err(ApiError::BadRequest(
            "username, password, dan nmpengguna wajib diisi".to_owned(),
        ));
    };
    let nipid = coerce::opt_str(b, "nipid");
    let level = fields::read(b, "level", Kind::Level)?.unwrap_or_else(|| Level::Operator.as_str().into());

    let mut clashes = Map::new();
    if query::exists(&state.pool, TABLE, &[Criterion::eq("username", username.as_str())])
        .await
        .context(FALLBACK)?
    {
        clashes.insert("username".to_owned(), json!("Username sudah digunakan"));
    }
    if let Some(nipid) = &nipid {
        if query::exists(&state.pool, TABLE, &[Criterion::eq("nipid", nipid.as_str())])
            .await
            .context(FALLBACK)?
        {
            clashes.insert("nipid".to_owned(), json!("NIP/NIPID sudah digunakan"));
        }
    }
    if !clashes.is_empty() {
        let mut extra = Map::new();
        extra.insert("fields".to_owned(), Value::Object(clashes));
        return Err(ApiError::conflict_with("Duplicate", extra));
    }

    let hash = hash_password(password, state.config.salt_rounds).await?;
    let mut patch = Patch::new();
    patch
        .set_opt("nipid", nipid)
        .set("nmpengguna", nmpengguna)
        .set("username", username)
        .set("password", hash)
        .set_opt("kdopd", coerce::opt_str(b, "kdopd"))
        .set_opt("nmopd", coerce::opt_str(b, "nmopd"))
        .set("level", level)
        .set("datecreate", now())
        .set("lockuser", LockStatus::Aktif.as_str());
    let id = match query::insert(&state.pool, TABLE, &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => return Err(ApiError::Conflict("Conflict: value already exists".to_owned())),
        Err(e) => return Err(e).context(FALLBACK),
    };
    tracing::info!(id, "admin account registered");
    let row = found(state, &by_id(id), NOT_FOUND.to_owned(), FALLBACK).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

// ── API-key routes ──────────────────────────────────────────────

/// `GET /api/login` — accounts with their agency name, newest first. Passwords are never returned.
///
/// # Errors
/// Returns 401 without a key, 500 `{message}` on database failure.
pub async fn list(_: AnyKey, State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    list_accounts(&state).await
}

/// `POST /api/login`
///
/// # Errors
/// Returns 400 for missing fields, 409 `{error: "Duplicate", fields}` for a taken username or NIP.
pub async fn create(
    _: AnyKey,
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    register(&state, &b).await
}

/// `GET /api/login/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn get_item(_: UsersKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = key(&id, "Invalid id")?;
    found(&state, &by_id(id), NOT_FOUND.to_owned(), "Failed to fetch admin").await.map(Json)
}

/// `PUT /api/login/{id}` — partial update; an empty password leaves the hash alone.
///
/// # Errors
/// Returns 400 for bad values or nothing to update, 404 when missing, 409 on a clash.
pub async fn put_item(
    _: UsersKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(b): JsonBody,
) -> Result<Json<Value>, ApiError> {
    const FALLBACK: &str = "Failed to update";
    let id = key(&id, "Invalid id")?;
    let mut patch = fields::patch(&b, FIELDS)?;
    if let Some(password) = coerce::opt_str(&b, "password") {
        if !password_fits(&password) {
            return Err(ApiError::BadRequest("Password harus 2-72 karakter".to_owned()));
        }
        patch.set("password", hash_password(password, state.config.salt_rounds).await?);
    }
    if patch.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".to_owned()));
    }
    Target { table: TABLE, key: "id", id, fallback: FALLBACK }
        .patch(&state, &patch, NOT_FOUND, "Conflict: value already exists")
        .await?;
    tracing::info!(id, columns = patch.len(), "admin account updated");
    found(&state, &by_id(id), NOT_FOUND.to_owned(), FALLBACK).await.map(Json)
}

/// `DELETE /api/login/{id}`
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn delete_item(_: UsersKey, State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = key(&id, "Invalid id")?;
    Target { table: TABLE, key: "id", id, fallback: "Failed to delete" }
        .remove(&state, NOT_FOUND)
        .await?;
    Ok(Json(json!({ "ok": true })))
}

// ── Session routes ──────────────────────────────────────────────

/// `GET /api/admin`
///
/// # Errors
/// Returns 401 without a valid session token.
pub async fn session_list(_: Claims, State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    list_accounts(&state).await
}

/// `POST /api/admin`
///
/// # Errors
/// Returns 401 without a valid session token; otherwise as `POST /api/login`.
pub async fn session_create(
    _: Claims,
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    register(&state, &b).await
}

/// `GET /api/me` — the caller's token claims.
pub async fn me(claims: Claims) -> Json<Value> {
    Json(json!({ "user": claims }))
}

/// `POST /api/auth/login`
///
/// # Errors
/// Returns 400 without credentials, 401 for a wrong username or password,
/// 403 for a locked account.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(b): JsonBody,
) -> Result<([(header::HeaderName, String); 1], Json<Value>), ApiError> {
    const FALLBACK: &str = "Gagal login";
    let (Some(username), Some(password)) = (coerce::opt_str(&b, "username"), b.get("password").and_then(Value::as_str))
    else {
        return Err(ApiError::BadRequest("username dan password wajib diisi".to_owned()));
    };
    let Some(secret) = state.config.jwt_secret.clone() else {
        return Err(ApiError::Internal("JWT_SECRET is not configured".to_owned()));
    };
    let select = Select::new("id, username, nmpengguna, password, level, lockuser", TABLE)
        .filter(Criterion::eq("username", username.as_str()))
        .limit(1);
    let Some(row) = query::fetch_optional(&state.pool, &select, NumericMode::Numbers)
        .await
        .context(FALLBACK)?
    else {
        tracing::info!(%username, "sign-in for unknown user");
        return Err(ApiError::Unauthorized("Username atau password salah"));
    };
    let hash = row["password"].as_str().unwrap_or_default().to_owned();
    if !verify_password(password.to_owned(), hash).await? {
        tracing::info!(%username, "sign-in with wrong password");
        return Err(ApiError::Unauthorized("Username atau password salah"));
    }
    if row["lockuser"].as_str() == Some(LockStatus::Nonaktif.as_str()) {
        return Err(ApiError::Detailed {
            status: StatusCode::FORBIDDEN,
            message: "Akun nonaktif".to_owned(),
            extra: Map::new(),
        });
    }

    let sub = match &row["id"] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let role = row["level"].as_str().map(str::to_owned);
    let claims = Claims::new(sub, Some(username), role, chrono::Utc::now().timestamp());
    let token = sign_token(&claims, &secret)?;
    tracing::info!(sub = %claims.sub, "signed in");
    let user = json!({
        "id": row["id"],
        "username": row["username"],
        "nmpengguna": row["nmpengguna"],
        "level": row["level"],
    });
    Ok((
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(json!({ "ok": true, "token": token, "user": user })),
    ))
}

/// `POST /api/auth/logout`
pub async fn logout() -> ([(header::HeaderName, String); 1], Json<Value>) {
    ([(header::SET_COOKIE, cleared_cookie())], Json(json!({ "ok": true })))
}
