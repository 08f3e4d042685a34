//! "From this year onward" updates for `(entity, tahun)` keyed tables.
//!
//! Condition tables hold one row per entity per year. Correcting an entity's
//! attributes for a year also corrects every later year, so an update is
//! scoped to `entity = ? AND tahun >= ?`.

use serde_json::Value;
use sitarida_core::{NumericMode, Patch, SqlValue};
use sqlx::mysql::MySqlPool;

use crate::error::StoreError;
use crate::query::{self, Criterion, Select};

/// Which rows a bulk update covers.
#[derive(Debug, Clone, PartialEq)]
pub struct YearScope {
    /// Table to update.
    pub table: &'static str,
    /// Entity key column, e.g. `noruas`.
    pub key: &'static str,
    /// Entity key value.
    pub value: SqlValue,
    /// Lowest year included.
    pub tahun_gte: i64,
}

impl YearScope {
    /// The WHERE criteria for this scope.
    #[must_use]
    pub fn criteria(&self) -> Vec<Criterion> {
        vec![
            Criterion::Eq(self.key, self.value.clone()),
            Criterion::gte("tahun", self.tahun_gte),
        ]
    }
}

/// Result of [`update_from_year`].
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    /// Rows in scope when the update ran.
    pub updated: u64,
    /// First row in scope after the update, when requested.
    pub sample: Option<Value>,
}

/// Applies `patch` to every row in `scope` inside one transaction.
///
/// The reported count is the number of rows matched, not only rows whose
/// values changed.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when nothing is in scope, in which case
/// nothing is written. Any driver or server failure rolls the transaction
/// back on drop.
pub async fn update_from_year(
    pool: &MySqlPool,
    scope: &YearScope,
    patch: &Patch,
    sample: Option<Select>,
) -> Result<BulkOutcome, StoreError> {
    let criteria = scope.criteria();
    let mut tx = pool.begin().await?;
    let matched = query::count(&mut *tx, scope.table, &criteria).await?;
    if matched == 0 {
        tx.rollback().await?;
        return Err(StoreError::NotFound);
    }
    query::update(&mut *tx, scope.table, patch, &criteria).await?;
    let sample = match sample {
        Some(select) => {
            let select = criteria.into_iter().fold(select, Select::filter);
            query::fetch_optional(&mut *tx, &select, NumericMode::JsonSafe).await?
        }
        None => None,
    };
    tx.commit().await?;
    Ok(BulkOutcome {
        updated: u64::try_from(matched).unwrap_or_default(),
        sample,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_filters_by_key_and_year() {
        let scope = YearScope {
            table: "tbljalankondisi",
            key: "noruas",
            value: SqlValue::Int(12),
            tahun_gte: 2023,
        };
        assert_eq!(
            scope.criteria(),
            vec![
                Criterion::Eq("noruas", SqlValue::Int(12)),
                Criterion::Gte("tahun", SqlValue::Int(2023)),
            ]
        );
    }
}
