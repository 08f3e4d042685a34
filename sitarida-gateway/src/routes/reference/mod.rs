//! Lookup tables: districts, villages, agencies, road segments, bridges and
//! irrigation networks.
//!
//! Each table is addressed by a single integer key. The helpers below cover
//! the parts every handler repeats: key parsing, fetch-or-404, patch-or-404
//! and delete-or-404.

pub mod desa;
pub mod irigasi;
pub mod jalan;
pub mod jembatan;
pub mod kecamatan;
pub mod opd;

use serde_json::Value;
use sitarida_core::{coerce, NumericMode, Patch};
use sitarida_store::{query, Criterion, Select, StoreError};

use crate::{
    error::{ApiError, Context},
    state::AppState,
};

/// Parses a positive integer key, failing with `invalid`.
pub(crate) fn key(raw: &str, invalid: &str) -> Result<i64, ApiError> {
    coerce::parse_id(raw).ok_or_else(|| ApiError::BadRequest(invalid.to_owned()))
}

/// Runs `select` and turns an empty result into 404 `missing`.
pub(crate) async fn found(
    state: &AppState,
    select: &Select,
    missing: String,
    fallback: &'static str,
) -> Result<Value, ApiError> {
    query::fetch_optional(&state.pool, select, NumericMode::JsonSafe)
        .await
        .context(fallback)?
        .ok_or(ApiError::NotFound(missing))
}

/// Where a keyed write lands and what it answers when things go wrong.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target {
    pub table: &'static str,
    pub key: &'static str,
    pub id: i64,
    pub fallback: &'static str,
}

impl Target {
    fn criteria(&self) -> [Criterion; 1] {
        [Criterion::eq(self.key, self.id)]
    }

    /// Applies `patch` to an existing row; 404 `missing` when there is none,
    /// 409 `conflict` on a unique clash.
    pub(crate) async fn patch(&self, state: &AppState, patch: &Patch, missing: &str, conflict: &str) -> Result<(), ApiError> {
        if !query::exists(&state.pool, self.table, &self.criteria())
            .await
            .context(self.fallback)?
        {
            return Err(ApiError::NotFound(missing.to_owned()));
        }
        match query::update(&state.pool, self.table, patch, &self.criteria()).await {
            Ok(_) => Ok(()),
            Err(StoreError::Duplicate(_)) => Err(ApiError::Conflict(conflict.to_owned())),
            Err(e) => Err(e).context(self.fallback),
        }
    }

    /// Deletes the row; 404 `missing` when nothing was removed.
    pub(crate) async fn remove(&self, state: &AppState, missing: &str) -> Result<(), ApiError> {
        let n = query::delete(&state.pool, self.table, &self.criteria())
            .await
            .context(self.fallback)?;
        if n == 0 {
            return Err(ApiError::NotFound(missing.to_owned()));
        }
        tracing::info!(table = self.table, id = self.id, "reference row deleted");
        Ok(())
    }
}
