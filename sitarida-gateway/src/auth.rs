//! Request authentication: static API keys and HMAC-signed session tokens.
//!
//! Handlers opt in by taking one of the extractors below as an argument.
//! [`AnyKey`] accepts any configured key, [`UsersKey`] only the users key and
//! [`Claims`] a valid session token.

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::ApiError, state::AppState};

/// Session lifetime in seconds.
pub const TOKEN_TTL_SECS: i64 = 3600;

/// Name of the session cookie.
pub const TOKEN_COOKIE: &str = "token";

const API_KEY_HEADER: &str = "x-api-key";

// ── Key checks ────────────────────────────────────────────────────────────────

/// `true` when `key` is accepted by routes open to any configured key.
///
/// Outside production, a process with no keys configured lets every request
/// through.
#[must_use]
pub fn any_key_ok(config: &Config, key: Option<&str>) -> bool {
    if config.no_keys_configured() {
        return !config.production;
    }
    let Some(key) = key else {
        return false;
    };
    config.api_key_users.as_deref() == Some(key)
        || config.api_key_admin.as_deref() == Some(key)
        || config.api_keys.iter().any(|k| k == key)
}

/// `true` when `key` is the users key.
#[must_use]
pub fn users_key_ok(config: &Config, key: Option<&str>) -> bool {
    match (&config.api_key_users, key) {
        (Some(expected), Some(key)) => expected == key,
        _ => false,
    }
}

#[derive(Deserialize)]
struct KeyQuery {
    api_key: Option<String>,
}

fn header_key(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn query_key(parts: &Parts) -> Option<String> {
    Query::<KeyQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.api_key)
        .filter(|k| !k.is_empty())
}

/// Proof that the request carried any accepted key (header or `?api_key=`).
#[derive(Debug, Clone, Copy)]
pub struct AnyKey;

impl FromRequestParts<AppState> for AnyKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let key = header_key(parts).or_else(|| query_key(parts));
        if any_key_ok(&state.config, key.as_deref()) {
            Ok(AnyKey)
        } else {
            tracing::debug!(path = %parts.uri.path(), "api key rejected");
            Err(ApiError::Unauthorized("Masukkan API KEY"))
        }
    }
}

/// Proof that the request carried the users key in `x-api-key`.
#[derive(Debug, Clone, Copy)]
pub struct UsersKey;

impl FromRequestParts<AppState> for UsersKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if users_key_ok(&state.config, header_key(parts).as_deref()) {
            Ok(UsersKey)
        } else {
            Err(ApiError::Unauthorized("Unauthorized"))
        }
    }
}

// ── Session tokens ────────────────────────────────────────────────────────────

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Admin id.
    pub sub: String,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Admin level.
    #[serde(default)]
    pub role: Option<String>,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    /// Claims for `sub` issued at `now`, valid for [`TOKEN_TTL_SECS`].
    #[must_use]
    pub fn new(sub: String, username: Option<String>, role: Option<String>, now: i64) -> Self {
        Self {
            sub,
            username,
            role,
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        }
    }
}

/// Signs `claims` with HS256.
///
/// # Errors
/// Returns [`ApiError::Internal`] if encoding fails.
pub fn sign_token(claims: &Claims, secret: &str) -> Result<String, ApiError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

/// Verifies an HS256 or HS512 token and its expiry.
///
/// # Errors
/// Returns [`ApiError::Unauthorized`] for any invalid, expired or
/// wrongly-signed token.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS512];
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            ApiError::Unauthorized("Unauthorized")
        })
}

fn cookie_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl FromRequestParts<AppState> for Claims {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.jwt_secret.as_deref() else {
            return Err(ApiError::Internal("JWT_SECRET is not configured".to_owned()));
        };
        let token = cookie_token(parts)
            .or_else(|| bearer_token(parts))
            .ok_or(ApiError::Unauthorized("Unauthorized"))?;
        verify_token(&token, secret)
    }
}

/// `Set-Cookie` value carrying a fresh session token.
#[must_use]
pub fn session_cookie(token: &str) -> String {
    format!("{TOKEN_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={TOKEN_TTL_SECS}")
}

/// `Set-Cookie` value that clears the session.
#[must_use]
pub fn cleared_cookie() -> String {
    format!("{TOKEN_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

// ── Passwords ─────────────────────────────────────────────────────────────────

/// Hashes `password` with bcrypt on the blocking pool.
///
/// # Errors
/// Returns [`ApiError::Internal`] if hashing fails.
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("bcrypt hash failed: {e}")))
}

/// Checks `password` against a bcrypt hash on the blocking pool.
///
/// A malformed stored hash counts as a mismatch.
///
/// # Errors
/// Returns [`ApiError::Internal`] if the blocking task panics.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| ApiError::Internal(format!("verify task failed: {e}")))
}
