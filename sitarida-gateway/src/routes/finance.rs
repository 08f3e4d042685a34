//! Budget realisation from the fiscal-year schema.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use sitarida_store::finance::{self, BelanjaFilter};

use crate::{
    error::{ApiError, Context},
    routes::trimmed,
    state::AppState,
};

const DEFAULT_TAHUN: &str = "2025";

#[derive(Debug, Default, Deserialize)]
pub struct BelanjaQuery {
    pub tahun: Option<String>,
    pub kd_skpd: Option<String>,
    pub rek: Option<String>,
}

impl BelanjaQuery {
    fn filter(&self) -> BelanjaFilter {
        BelanjaFilter {
            tahun: trimmed(self.tahun.as_ref()).unwrap_or(DEFAULT_TAHUN).to_owned(),
            kd_skpd: trimmed(self.kd_skpd.as_ref()).map(str::to_owned),
            rek: trimmed(self.rek.as_ref()).map(str::to_owned),
        }
    }
}

/// `GET /api/bpkpad/belanja` — allocation, realisation and percentage per work unit and account.
///
/// # Errors
/// Returns 500 on database failure or a misconfigured schema name.
pub async fn belanja(State(state): State<AppState>, Query(q): Query<BelanjaQuery>) -> Result<Json<Value>, ApiError> {
    let filter = q.filter();
    let rows = finance::belanja(&state.pool, &state.config.finance_schema, &filter)
        .await
        .context("Internal Server Error")?;
    tracing::debug!(tahun = %filter.tahun, rows = rows.len(), "belanja fetched");
    Ok(Json(Value::Array(rows)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_parameters_are_dropped_and_the_year_defaults() {
        let q = BelanjaQuery {
            tahun: Some(" ".to_owned()),
            kd_skpd: Some("1.02.0.00".to_owned()),
            rek: None,
        };
        assert_eq!(
            q.filter(),
            BelanjaFilter {
                tahun: "2025".to_owned(),
                kd_skpd: Some("1.02.0.00".to_owned()),
                rek: None,
            }
        );
    }
}
