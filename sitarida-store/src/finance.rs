//! Regional budget (APBD) spending against allocation.
//!
//! The budget data lives in a separate schema per fiscal year. Allocation
//! (`pagu`) comes from `trdrka`; realisation (`capaian`) is the net debit of
//! `trdmaping_skpd`. Only expenditure accounts (`kd_rek6` starting with `5`)
//! are counted.

use serde_json::Value;
use sitarida_core::NumericMode;
use sqlx::mysql::{MySql, MySqlPool};
use sqlx::QueryBuilder;

use crate::error::StoreError;
use crate::row::rows_to_json;

/// Filters for [`belanja`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BelanjaFilter {
    /// Fiscal year echoed in every row.
    pub tahun: String,
    /// Restrict to one work unit.
    pub kd_skpd: Option<String>,
    /// Restrict to one 6-character account prefix.
    pub rek: Option<String>,
}

/// `true` when `schema` can be spliced into SQL as a bare identifier.
#[must_use]
pub fn is_safe_identifier(schema: &str) -> bool {
    !schema.is_empty()
        && schema.len() <= 64
        && schema.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn statement(schema: &str) -> String {
    format!(
        "SELECT a.kd_skpd,
       (SELECT nm_skpd FROM {schema}.ms_skpd WHERE kd_skpd = a.kd_skpd LIMIT 1) AS nm_skpd,
       a.rek,
       a.nmrek,
       SUM(a.pagu) AS pagu,
       SUM(a.capaian) AS capaian,
       ROUND(SUM(a.capaian) / NULLIF(SUM(a.pagu), 0) * 100, 2) AS persen,
       a.tahun
FROM (
    SELECT kd_skpd, kd_sub_kegiatan, LEFT(kd_rek6, 6) AS rek,
           (SELECT nm_rek3 FROM {schema}.ms_rek3 WHERE kd_rek3 = LEFT(r.kd_rek6, 6) LIMIT 1) AS nmrek,
           SUM(nilai_ubah) AS pagu,
           0 AS capaian,
           ? AS tahun
    FROM {schema}.trdrka r
    WHERE LEFT(kd_rek6, 1) = '5'
    GROUP BY kd_skpd, kd_sub_kegiatan, LEFT(kd_rek6, 6)
    UNION
    SELECT kd_skpd, kd_sub_kegiatan, LEFT(kd_rek6, 6) AS rek,
           (SELECT nm_rek3 FROM {schema}.ms_rek3 WHERE kd_rek3 = LEFT(m.kd_rek6, 6) LIMIT 1) AS nmrek,
           0 AS pagu,
           SUM(debet - kredit) AS capaian,
           ? AS tahun
    FROM {schema}.trdmaping_skpd m
    WHERE LEFT(kd_rek6, 1) = '5'
    GROUP BY kd_skpd, kd_sub_kegiatan, LEFT(kd_rek6, 6)
) AS a"
    )
}

/// Spending per work unit and account prefix.
///
/// # Errors
/// Returns [`StoreError::InvalidIdentifier`] when `schema` is not a plain
/// identifier, or another [`StoreError`] on failure.
pub async fn belanja(pool: &MySqlPool, schema: &str, filter: &BelanjaFilter) -> Result<Vec<Value>, StoreError> {
    if !is_safe_identifier(schema) {
        return Err(StoreError::InvalidIdentifier(schema.to_owned()));
    }
    let mut qb = QueryBuilder::<MySql>::new(statement(schema));
    qb.push_bind(filter.tahun.clone());
    qb.push_bind(filter.tahun.clone());
    let filters = [("a.kd_skpd", &filter.kd_skpd), ("a.rek", &filter.rek)];
    let active = filters.iter().filter_map(|(col, v)| v.as_ref().map(|v| (*col, v.clone())));
    for (i, (col, v)) in active.enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(col).push(" = ").push_bind(v);
    }
    qb.push(" GROUP BY a.kd_skpd, a.rek, a.nmrek, a.tahun ORDER BY a.kd_skpd, a.rek");
    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows_to_json(&rows, NumericMode::Raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names_are_checked() {
        assert!(is_safe_identifier("sitarida2025"));
        assert!(!is_safe_identifier("sitarida2025; DROP TABLE x"));
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("a.b"));
    }

    #[test]
    fn statement_binds_tahun_twice() {
        let sql = statement("sitarida2025");
        assert_eq!(sql.matches("? AS tahun").count(), 2);
        assert!(sql.contains("sitarida2025.trdrka"));
        assert!(sql.contains("NULLIF(SUM(a.pagu), 0)"));
    }
}
