//! Tables with one row per district per year and a derived column.
//!
//! Stunting prevalence and population counts share the same rules: every
//! count is a non-negative whole number, the district code and name are
//! reconciled against rows already stored, a derived column is recomputed on
//! every write, and `(kdkecamatan, tahun)` is unique.

use std::collections::HashMap;

use axum::http::StatusCode;
use serde_json::{Map, Value};
use sitarida_core::{coerce, indicator, NumericMode, Patch, SqlValue};
use sitarida_store::{lookup, query, Criterion, Select};

use crate::error::{ApiError, Context};
use crate::routes::insert_id;
use crate::state::AppState;

/// Derived column computation over the merged integer inputs.
pub type Derive = fn(&HashMap<&'static str, i64>) -> SqlValue;

/// Per-table settings.
#[derive(Debug, Clone, Copy)]
pub struct DistrictYear {
    /// Table name.
    pub table: &'static str,
    /// Integer inputs besides `kdkecamatan` and `tahun`.
    pub counts: &'static [&'static str],
    /// Derived column.
    pub derived: &'static str,
    /// Computes [`DistrictYear::derived`].
    pub derive: Derive,
    /// Status for a duplicate `(kdkecamatan, tahun)`.
    pub duplicate_status: StatusCode,
    /// Message for a duplicate `(kdkecamatan, tahun)`.
    pub duplicate_message: &'static str,
    /// Columns of the clashing row echoed as `existingData`.
    pub existing_columns: &'static str,
    /// 500 messages for list, create, get, update and delete.
    pub fallback: [&'static str; 5],
}

/// `persentase = balitaStunting * 100 / jumlahBalita`, zero without toddlers.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn stunting_persentase(v: &HashMap<&'static str, i64>) -> SqlValue {
    let balita = v.get("jumlahBalita").copied().unwrap_or_default();
    let stunting = v.get("balitaStunting").copied().unwrap_or_default();
    SqlValue::Float(indicator::percent(stunting as f64, balita as f64))
}

/// `total = lakiLaki + perempuan`.
#[must_use]
pub fn penduduk_total(v: &HashMap<&'static str, i64>) -> SqlValue {
    let laki = v.get("lakiLaki").copied().unwrap_or_default();
    let perempuan = v.get("perempuan").copied().unwrap_or_default();
    SqlValue::Int(laki.saturating_add(perempuan))
}

fn whole_number(raw: &Value, name: &str) -> Result<i64, ApiError> {
    if coerce::to_num(raw).is_none() {
        return Err(ApiError::BadRequest(format!("Field {name} harus berupa angka")));
    }
    coerce::to_int(raw).ok_or_else(|| ApiError::BadRequest(format!("Field {name} harus berupa bilangan bulat")))
}

impl DistrictYear {
    fn numeric_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        ["kdkecamatan", "tahun"].into_iter().chain(self.counts.iter().copied())
    }

    /// Reads and checks the integer fields present in `body`.
    ///
    /// With `require` set, every field (and `nmkecamatan`) must be present.
    fn read_numbers(&self, body: &Value, require: bool) -> Result<HashMap<&'static str, i64>, ApiError> {
        if require {
            let required = ["kdkecamatan", "nmkecamatan", "tahun"]
                .into_iter()
                .chain(self.counts.iter().copied());
            for name in required {
                if body.get(name).is_none_or(Value::is_null) {
                    return Err(ApiError::BadRequest(format!("Field {name} wajib diisi")));
                }
            }
        }
        let mut out = HashMap::new();
        for name in self.numeric_fields() {
            let Some(raw) = body.get(name).filter(|v| !v.is_null()) else {
                continue;
            };
            let n = whole_number(raw, name)?;
            if n < 0 {
                return Err(ApiError::BadRequest(format!("Field {name} tidak boleh negatif")));
            }
            out.insert(name, n);
        }
        Ok(out)
    }

    async fn duplicate(&self, state: &AppState, kd: i64, tahun: i64, except: Option<i64>) -> Result<(), ApiError> {
        let select = Select::new(self.existing_columns, self.table)
            .filter(Criterion::eq("kdkecamatan", kd))
            .filter(Criterion::eq("tahun", tahun))
            .filter_opt(except.map(|id| Criterion::ne("id", id)));
        let clash = query::fetch_optional(&state.pool, &select, NumericMode::JsonSafe)
            .await
            .context(self.fallback[1])?;
        match clash {
            None => Ok(()),
            Some(existing) => {
                let mut extra = Map::new();
                extra.insert("existingData".to_owned(), existing);
                Err(ApiError::Detailed {
                    status: self.duplicate_status,
                    message: self.duplicate_message.to_owned(),
                    extra,
                })
            }
        }
    }

    async fn by_id(&self, state: &AppState, id: i64, fallback: &'static str) -> Result<Option<Value>, ApiError> {
        let select = Select::new("*", self.table).filter(Criterion::eq("id", id));
        query::fetch_optional(&state.pool, &select, NumericMode::JsonSafe)
            .await
            .context(fallback)
    }
}

fn parse_item_id(raw: &str) -> Result<i64, ApiError> {
    coerce::parse_id(raw).ok_or_else(|| ApiError::BadRequest("ID harus integer positif".to_owned()))
}

/// `GET` collection: optional `tahun` and `kecamatan` (name contains).
///
/// # Errors
/// Returns 500 on database failure.
pub async fn list(
    state: &AppState,
    t: &DistrictYear,
    tahun: Option<&str>,
    kecamatan: Option<&str>,
) -> Result<Vec<Value>, ApiError> {
    let select = Select::new("*", t.table)
        .filter_opt(tahun.and_then(|s| s.trim().parse::<i64>().ok()).map(|y| Criterion::eq("tahun", y)))
        .filter_opt(
            kecamatan
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|k| Criterion::contains("nmkecamatan", k)),
        )
        .order_by("tahun DESC, kdkecamatan ASC");
    query::fetch_all(&state.pool, &select, NumericMode::JsonSafe)
        .await
        .context(t.fallback[0])
}

/// `POST` collection: validates, reconciles the district, derives, inserts.
///
/// # Errors
/// Returns 400 for missing or non-integer fields, the configured duplicate
/// status for an existing `(kdkecamatan, tahun)`, 500 on database failure.
pub async fn create(state: &AppState, t: &DistrictYear, body: &Value) -> Result<Value, ApiError> {
    let numbers = t.read_numbers(body, true)?;
    let nm = coerce::opt_str(body, "nmkecamatan");
    let (kd, nm) = lookup::sync_kecamatan(&state.pool, t.table, numbers.get("kdkecamatan").copied(), nm)
        .await
        .context(t.fallback[1])?;
    let (Some(kd), Some(tahun)) = (kd, numbers.get("tahun").copied()) else {
        return Err(ApiError::BadRequest("Field kdkecamatan wajib diisi".to_owned()));
    };
    t.duplicate(state, kd, tahun, None).await?;

    let mut patch = Patch::new();
    patch.set("kdkecamatan", kd).set_opt("nmkecamatan", nm).set("tahun", tahun);
    for name in t.counts {
        patch.set_opt(name, numbers.get(name).copied());
    }
    patch.set(t.derived, (t.derive)(&numbers));

    let id = match query::insert(&state.pool, t.table, &patch).await {
        Ok(id) => insert_id(id)?,
        Err(e) if e.is_conflict() => {
            return Err(ApiError::Detailed {
                status: t.duplicate_status,
                message: t.duplicate_message.to_owned(),
                extra: Map::new(),
            })
        }
        Err(e) => return Err(e).context(t.fallback[1]),
    };
    tracing::info!(table = t.table, id, kdkecamatan = kd, tahun, "row created");
    t.by_id(state, id, t.fallback[1])
        .await?
        .ok_or_else(|| ApiError::Internal(format!("row {id} vanished after insert")))
}

/// `GET /{id}`.
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn get(state: &AppState, t: &DistrictYear, id: &str) -> Result<Value, ApiError> {
    let id = parse_item_id(id)?;
    t.by_id(state, id, t.fallback[2])
        .await?
        .ok_or_else(|| ApiError::NotFound("Data tidak ditemukan".to_owned()))
}

/// `PUT /{id}`: merges with the stored row and recomputes the derived column.
///
/// # Errors
/// Returns 400 for a bad id or field, 404 when missing, the duplicate status
/// when another row already holds the merged `(kdkecamatan, tahun)`.
pub async fn update(state: &AppState, t: &DistrictYear, id: &str, body: &Value) -> Result<Value, ApiError> {
    let id = parse_item_id(id)?;
    let Some(existing) = t.by_id(state, id, t.fallback[3]).await? else {
        return Err(ApiError::NotFound("Data tidak ditemukan".to_owned()));
    };
    let given = t.read_numbers(body, false)?;

    let mut merged: HashMap<&'static str, i64> = t
        .numeric_fields()
        .filter_map(|name| coerce::to_int(&existing[name]).map(|n| (name, n)))
        .collect();
    merged.extend(given.iter().map(|(k, v)| (*k, *v)));

    let nm = coerce::opt_str(body, "nmkecamatan").or_else(|| coerce::to_str(&existing["nmkecamatan"]));
    let (kd, nm) = lookup::sync_kecamatan(&state.pool, t.table, merged.get("kdkecamatan").copied(), nm)
        .await
        .context(t.fallback[3])?;
    if let Some(kd) = kd {
        merged.insert("kdkecamatan", kd);
    }
    if let (Some(kd), Some(tahun)) = (merged.get("kdkecamatan"), merged.get("tahun")) {
        t.duplicate(state, *kd, *tahun, Some(id)).await?;
    }

    let mut patch = Patch::new();
    patch
        .set_opt("kdkecamatan", merged.get("kdkecamatan").copied())
        .set_opt("nmkecamatan", nm)
        .set_opt("tahun", merged.get("tahun").copied());
    for name in t.counts {
        patch.set_opt(name, given.get(name).copied());
    }
    patch.set(t.derived, (t.derive)(&merged));

    query::update(&state.pool, t.table, &patch, &[Criterion::eq("id", id)])
        .await
        .context(t.fallback[3])?;
    t.by_id(state, id, t.fallback[3])
        .await?
        .ok_or_else(|| ApiError::NotFound("Data tidak ditemukan".to_owned()))
}

/// `DELETE /{id}`.
///
/// # Errors
/// Returns 400 for a bad id, 404 when missing.
pub async fn delete(state: &AppState, t: &DistrictYear, id: &str) -> Result<(), ApiError> {
    let id = parse_item_id(id)?;
    let n = query::delete(&state.pool, t.table, &[Criterion::eq("id", id)])
        .await
        .context(t.fallback[4])?;
    if n == 0 {
        return Err(ApiError::NotFound("Data tidak ditemukan".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const STUNTING: DistrictYear = DistrictYear {
        table: "tblPrevalensiStunting",
        counts: &["jumlahBalita", "balitaStunting"],
        derived: "persentase",
        derive: stunting_persentase,
        duplicate_status: StatusCode::CONFLICT,
        duplicate_message: "dup",
        existing_columns: "id",
        fallback: ["a", "b", "c", "d", "e"],
    };

    fn values(pairs: &[(&'static str, i64)]) -> HashMap<&'static str, i64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn persentase_is_rounded_and_zero_safe() {
        assert_eq!(
            stunting_persentase(&values(&[("jumlahBalita", 3), ("balitaStunting", 1)])),
            SqlValue::Float(33.33)
        );
        assert_eq!(
            stunting_persentase(&values(&[("jumlahBalita", 0), ("balitaStunting", 5)])),
            SqlValue::Float(0.0)
        );
    }

    #[test]
    fn total_adds_both_sexes() {
        assert_eq!(
            penduduk_total(&values(&[("lakiLaki", 120), ("perempuan", 130)])),
            SqlValue::Int(250)
        );
    }

    #[test]
    fn missing_fields_are_named_in_order() {
        let err = match STUNTING.read_numbers(&json!({"kdkecamatan": 1, "nmkecamatan": "A"}), true) {
            Ok(_) => panic!("expected error"),
            Err(e) => e.to_string(),
        };
        assert_eq!(err, "Field tahun wajib diisi");
    }

    #[test]
    fn numbers_must_be_whole_and_non_negative() {
        let base = json!({"kdkecamatan": "7", "nmkecamatan": "A", "tahun": 2024, "jumlahBalita": "x", "balitaStunting": 1});
        let err = match STUNTING.read_numbers(&base, true) {
            Ok(_) => panic!("expected error"),
            Err(e) => e.to_string(),
        };
        assert_eq!(err, "Field jumlahBalita harus berupa angka");

        let frac = json!({"jumlahBalita": 1.5});
        let err = match STUNTING.read_numbers(&frac, false) {
            Ok(_) => panic!("expected error"),
            Err(e) => e.to_string(),
        };
        assert_eq!(err, "Field jumlahBalita harus berupa bilangan bulat");

        assert!(STUNTING.read_numbers(&json!({"balitaStunting": -1}), false).is_err());
    }

    #[test]
    fn partial_reads_skip_absent_fields() {
        let got = match STUNTING.read_numbers(&json!({"tahun": "2023"}), false) {
            Ok(v) => v,
            Err(e) => panic!("read failed: {e}"),
        };
        assert_eq!(got, values(&[("tahun", 2023)]));
    }
}
