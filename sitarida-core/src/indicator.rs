//! Indicator (IKU) shaping.
//!
//! Indicator targets live in one long table keyed by `(kdiku, tahun)`. The
//! dashboards want them wide: one object per year with a named field per
//! indicator. [`Pivot`] describes that mapping and [`Pivot::apply`] folds the
//! long rows into the wide form.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// How pivoted values are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotValue {
    /// JSON number; unparsable targets become `null`.
    Number,
    /// The target text as stored.
    Text,
}

/// One `(kdiku, tahun, target)` row of `tbltargetindikator`.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRow {
    /// Indicator code, e.g. `"1018"`.
    pub kdiku: String,
    /// Year as text.
    pub tahun: String,
    /// Target as stored (the column is textual in some schemas).
    pub target: Option<String>,
}

/// Mapping from indicator codes to output field names.
#[derive(Debug, Clone, Copy)]
pub struct Pivot {
    /// `(kdiku, field)` pairs; the order fixes the field order per year.
    pub fields: &'static [(&'static str, &'static str)],
    /// Rendering of the values.
    pub value: PivotValue,
}

impl Pivot {
    /// Indicator codes covered by this pivot.
    #[must_use]
    pub fn codes(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(code, _)| *code).collect()
    }

    /// Folds long rows into one object per year, keeping first-seen year order.
    ///
    /// Every output object carries all mapped fields; missing ones are `null`.
    /// Later rows for the same `(tahun, kdiku)` overwrite earlier ones.
    #[must_use]
    pub fn apply(&self, rows: &[TargetRow]) -> Vec<Value> {
        let mut years: IndexMap<String, Map<String, Value>> = IndexMap::new();
        for row in rows {
            let entry = years.entry(row.tahun.clone()).or_insert_with(|| {
                let mut obj = Map::new();
                obj.insert("tahun".to_owned(), Value::String(row.tahun.clone()));
                for (_, field) in self.fields {
                    obj.insert((*field).to_owned(), Value::Null);
                }
                obj
            });
            if let Some((_, field)) = self.fields.iter().find(|(code, _)| *code == row.kdiku) {
                entry.insert((*field).to_owned(), self.render(row.target.as_deref()));
            }
        }
        years.into_values().map(Value::Object).collect()
    }

    fn render(&self, target: Option<&str>) -> Value {
        let Some(raw) = target else {
            return Value::Null;
        };
        match self.value {
            PivotValue::Text => Value::String(raw.to_owned()),
            PivotValue::Number => number(raw),
        }
    }
}

/// Health sector: life expectancy, stunting, tuberculosis.
pub const KESEHATAN: Pivot = Pivot {
    fields: &[("1018", "nilaiusia"), ("1019", "nilaistunting"), ("1020", "nilaitbc")],
    value: PivotValue::Number,
};

/// Welfare: poverty, inflation, unemployment.
pub const KESEJAHTERAAN: Pivot = Pivot {
    fields: &[("1011", "nilaimiskin"), ("1012", "nilaiinflasi"), ("1013", "nilainganggur")],
    value: PivotValue::Number,
};

/// Regional economy figures, reported as text.
pub const PERKAPITA: Pivot = Pivot {
    fields: &[
        ("1008", "pert_ekonomi"),
        ("1009", "pdrb_perkapita"),
        ("1010", "kontribusi_kabupaten"),
    ],
    value: PivotValue::Text,
};

/// Codes for the AKIP (performance accountability) target list.
pub const AKIP_CODES: &[&str] = &["1021", "1022", "1023"];

/// Infrastructure indicator codes merged by the composite query.
pub const INFRASTRUKTUR_CODES: &[&str] = &["1001", "1002", "1003", "1004", "1005", "1006", "1007"];

/// Field name for a human-resource quality code stored in `tblkualitassdm`.
#[must_use]
pub fn kualitas_sdm_field(kdiku: &str) -> Option<&'static str> {
    match kdiku.trim() {
        "15" => Some("harapanlamasekolah"),
        "16" => Some("rata2lamasekolah"),
        "17" => Some("ipm"),
        _ => None,
    }
}

/// Parses text into a JSON number, or `null` when it is not numeric.
#[must_use]
pub fn number(raw: &str) -> Value {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// `part / whole * 100` rounded to two decimals; zero when `whole` is zero.
#[must_use]
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 || !whole.is_finite() || !part.is_finite() {
        return 0.0;
    }
    round2(part / whole * 100.0)
}

/// Rounds half away from zero to two decimals.
#[must_use]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Two-decimal text, or `None` for non-finite input.
#[must_use]
pub fn fixed2(v: f64) -> Option<String> {
    v.is_finite().then(|| format!("{v:.2}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(kdiku: &str, tahun: &str, target: Option<&str>) -> TargetRow {
        TargetRow {
            kdiku: kdiku.to_owned(),
            tahun: tahun.to_owned(),
            target: target.map(str::to_owned),
        }
    }

    #[test]
    fn pivot_groups_by_year_in_first_seen_order() {
        let rows = vec![
            row("1018", "2021", Some("68.5")),
            row("1019", "2021", Some("21.4")),
            row("1018", "2022", Some("69")),
            row("1020", "2021", None),
        ];
        let out = KESEHATAN.apply(&rows);
        assert_eq!(
            out,
            vec![
                json!({"tahun": "2021", "nilaiusia": 68.5, "nilaistunting": 21.4, "nilaitbc": null}),
                json!({"tahun": "2022", "nilaiusia": 69.0, "nilaistunting": null, "nilaitbc": null}),
            ]
        );
    }

    #[test]
    fn pivot_text_mode_keeps_stored_text() {
        let out = PERKAPITA.apply(&[row("1009", "2023", Some("45.120.000"))]);
        assert_eq!(out[0]["pdrb_perkapita"], json!("45.120.000"));
        assert_eq!(out[0]["pert_ekonomi"], Value::Null);
    }

    #[test]
    fn pivot_ignores_unmapped_codes() {
        let out = KESEJAHTERAAN.apply(&[row("9999", "2020", Some("1"))]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["nilaimiskin"], Value::Null);
    }

    #[test]
    fn percent_guards_zero_denominator() {
        assert!((percent(5.0, 0.0)).abs() < f64::EPSILON);
        assert!((percent(1.0, 3.0) - 33.33).abs() < 1e-9);
    }

    #[test]
    fn fixed2_formats_two_decimals() {
        assert_eq!(fixed2(12.345_6), Some("12.35".to_owned()));
        assert_eq!(fixed2(f64::NAN), None);
    }

    #[test]
    fn kualitas_sdm_codes_map_to_fields() {
        assert_eq!(kualitas_sdm_field("16"), Some("rata2lamasekolah"));
        assert_eq!(kualitas_sdm_field("18"), None);
    }
}
