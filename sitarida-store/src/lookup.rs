//! Reference-table lookups used to backfill names and codes on write.

use sitarida_core::SqlValue;
use sqlx::mysql::{MySql, MySqlPool};
use sqlx::{QueryBuilder, Row};

use crate::error::StoreError;
use crate::query::push_value;

/// Reads `column` as text from the first row of `table` where `key = value`.
///
/// The column is cast to CHAR so integer and text columns read alike.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn text_by_key(
    pool: &MySqlPool,
    table: &'static str,
    column: &'static str,
    key: &'static str,
    value: &SqlValue,
) -> Result<Option<String>, StoreError> {
    let mut qb = QueryBuilder::<MySql>::new("SELECT CAST(");
    qb.push(column)
        .push(" AS CHAR) FROM ")
        .push(table)
        .push(" WHERE ")
        .push(key)
        .push(" = ");
    push_value(&mut qb, value);
    qb.push(" LIMIT 1");
    let row = qb.build().fetch_optional(pool).await?;
    match row {
        Some(r) => Ok(r.try_get::<Option<String>, _>(0)?.filter(|s| !s.trim().is_empty())),
        None => Ok(None),
    }
}

/// District name for a district code in `refkecamatan`.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn kecamatan_name(pool: &MySqlPool, kdkecamatan: &str) -> Result<Option<String>, StoreError> {
    let Ok(code) = kdkecamatan.trim().parse::<i64>() else {
        return Ok(None);
    };
    if code <= 0 {
        return Ok(None);
    }
    text_by_key(pool, "refkecamatan", "nmkecamatan", "kdkecamatan", &SqlValue::Int(code)).await
}

/// `true` when `kdkecamatan` exists in `refkecamatan`.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn kecamatan_exists(pool: &MySqlPool, kdkecamatan: i64) -> Result<bool, StoreError> {
    Ok(text_by_key(pool, "refkecamatan", "kdkecamatan", "kdkecamatan", &SqlValue::Int(kdkecamatan))
        .await?
        .is_some())
}

/// District code and name made consistent against rows already in `table`.
///
/// The name wins: a known name replaces the code with the one stored next to
/// it, then the (possibly replaced) code pulls its stored name.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn sync_kecamatan(
    pool: &MySqlPool,
    table: &'static str,
    kd: Option<i64>,
    nm: Option<String>,
) -> Result<(Option<i64>, Option<String>), StoreError> {
    let mut kd = kd;
    let mut nm = nm;
    if let Some(name) = nm.as_deref() {
        let found = text_by_key(pool, table, "kdkecamatan", "nmkecamatan", &SqlValue::from(name)).await?;
        if let Some(code) = found.and_then(|c| c.trim().parse::<i64>().ok()) {
            kd = Some(code);
        }
    }
    if let Some(code) = kd {
        if let Some(name) = text_by_key(pool, table, "nmkecamatan", "kdkecamatan", &SqlValue::Int(code)).await? {
            nm = Some(name);
        }
    }
    Ok((kd, nm))
}

/// Road segment attributes used to backfill condition rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuasInfo {
    /// District code of the segment.
    pub kdkecamatan: Option<String>,
    /// District name of the segment.
    pub nmkecamatan: Option<String>,
    /// Segment name.
    pub namaruasjalan: Option<String>,
}

/// Looks up a road segment in `tblruasjalan` by `noruas`.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn ruas(pool: &MySqlPool, noruas: i64) -> Result<Option<RuasInfo>, StoreError> {
    let row = sqlx::query(
        "SELECT CAST(kdkecamatan AS CHAR), nmkecamatan, namaruasjalan FROM tblruasjalan WHERE noruas = ? LIMIT 1",
    )
    .bind(noruas)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(Some(RuasInfo {
        kdkecamatan: row.try_get::<Option<String>, _>(0)?,
        nmkecamatan: row.try_get::<Option<String>, _>(1)?,
        namaruasjalan: row.try_get::<Option<String>, _>(2)?,
    }))
}

/// Irrigation network name from `refirigasi`.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn irigasi_name(pool: &MySqlPool, kdirigasi: i64) -> Result<Option<String>, StoreError> {
    text_by_key(pool, "refirigasi", "msirigasi", "kdirigasi", &SqlValue::Int(kdirigasi)).await
}
