//! Composite indicator queries.
//!
//! Each indicator compares a yearly target from `tbltargetindikator` against
//! an achievement computed from the sector tables. The queries below put
//! targets and achievements side by side with a UNION and fold them per year.

use serde_json::{json, Value};
use sitarida_core::indicator::{fixed2, TargetRow};
use sitarida_core::json_safe::numberish;
use sitarida_core::{NumericMode, SqlValue};
use sqlx::mysql::{MySql, MySqlPool};
use sqlx::{QueryBuilder, Row};

use crate::error::StoreError;
use crate::query::{push_where, Criterion};
use crate::row::rows_to_json;

/// Infrastructure indicators 1001..1007: targets plus computed achievements.
pub const INFRASTRUKTUR_SQL: &str = "
SELECT k.id, k.indikator, k.tahun,
       SUM(k.target) AS target,
       ROUND(SUM(k.capaian), 2) AS capaian
FROM (
    SELECT a.kdiku AS id, a.nmiku AS indikator, a.tahun, a.target, 0 AS capaian
    FROM tbltargetindikator a
    WHERE a.kdiku IN ('1001','1002','1003','1004','1005','1006','1007')
    UNION
    SELECT id, indikator, tahun, target, capaian FROM vwindikatorinfrastrukturtahunan
    UNION
    SELECT '1002', 'Jaringan Jalan Mantap', z.tahun, 0,
           ROUND(CASE WHEN COALESCE(z.panjangjalan, 0) = 0 THEN 0
                      ELSE z.kondisibaik / z.panjangjalan * 100 END, 2)
    FROM (SELECT SUM(a.panjangruas) AS panjangjalan, SUM(b.kondisibaik) AS kondisibaik, b.tahun
          FROM tblruasjalan a
          INNER JOIN tbljalankondisi b ON a.noruas = b.noruas
          GROUP BY b.tahun) AS z
    UNION
    SELECT '1003', 'Jembatan', x.tahun, 0,
           ROUND(CASE WHEN COALESCE(x.totaljembatan, 0) = 0 THEN 0
                      ELSE x.konbaik / x.totaljembatan * 100 END, 2)
    FROM (SELECT b.tahun, SUM(b.total_jembatan) AS totaljembatan, SUM(b.jembatan_baik) AS konbaik
          FROM vwjembatankecamatantahun b
          GROUP BY b.tahun) AS x
    UNION
    SELECT '1004', 'Irigasi', x.tahun, 0,
           ROUND(CASE WHEN COALESCE(x.luasirigasi, 0) = 0 THEN 0
                      ELSE x.konbaik / x.luasirigasi * 100 END, 2)
    FROM (SELECT b.tahun, SUM(b.luas) AS luasirigasi, SUM(b.konirigasibaik) AS konbaik
          FROM refirigasi a
          INNER JOIN tblirigasi b ON a.kdirigasi = b.kdirigasi
          GROUP BY b.tahun) AS x
    UNION
    SELECT '1005', 'Air Minum', x.tahun, 0,
           ROUND(CASE WHEN COALESCE(x.jmlpenduduk, 0) = 0 THEN 0
                      ELSE x.jmlairminumlayak / x.jmlpenduduk * 100 END, 2)
    FROM (SELECT b.tahun, SUM(b.jmlpenduduk) AS jmlpenduduk, SUM(b.jmlairminumlayak) AS jmlairminumlayak
          FROM tblaksesairminum b
          GROUP BY b.tahun) AS x
    UNION
    SELECT '1006', 'Listrik', x.tahun, 0,
           ROUND(CASE WHEN COALESCE(x.dayatersedia, 0) = 0 THEN 0
                      ELSE x.dayadibutuhkan / x.dayatersedia * 100 END, 2)
    FROM (SELECT b.tahun, SUM(b.dayatersedia) AS dayatersedia, SUM(b.dayadibutuhkan) AS dayadibutuhkan
          FROM tbldayalistrik b
          GROUP BY b.tahun) AS x
    UNION
    SELECT '1007', 'Telekomunikasi', z.tahun, 0,
           ROUND(CASE WHEN COALESCE(z.totaldesa, 0) = 0 THEN 0
                      ELSE z.desaterlayani / z.totaldesa * 100 END, 2)
    FROM (SELECT SUM(a.totaldesa) AS totaldesa, SUM(a.desaterlayani) AS desaterlayani, a.tahun
          FROM tblikucakupantelekomunikasi a
          GROUP BY a.tahun) AS z
) AS k
GROUP BY k.id, k.indikator, k.tahun
ORDER BY k.id, k.tahun";

/// Human-resource quality (1015..1017): targets against achievements per year.
pub const KUALITAS_SDM_SQL: &str = "
SELECT RIGHT(tahun, 2) AS id, tahun,
       SUM(targetharapanlamasekolah) AS targetharapanlamasekolah,
       SUM(harapanlamasekolah) AS harapanlamasekolah,
       SUM(targetrata2lamasekolah) AS targetrata2lamasekolah,
       SUM(rata2lamasekolah) AS rata2lamasekolah,
       SUM(targetipm) AS targetipm,
       SUM(ipm) AS ipm
FROM (
    SELECT tahun,
           CASE WHEN kdiku = '1015' THEN target ELSE 0 END AS targetharapanlamasekolah,
           0 AS harapanlamasekolah,
           CASE WHEN kdiku = '1016' THEN target ELSE 0 END AS targetrata2lamasekolah,
           0 AS rata2lamasekolah,
           CASE WHEN kdiku = '1017' THEN target ELSE 0 END AS targetipm,
           0 AS ipm
    FROM tbltargetindikator
    WHERE kdiku IN ('1015','1016','1017')
    UNION ALL
    SELECT tahun,
           0,
           CASE WHEN kdiku = '1015' THEN capaian ELSE 0 END,
           0,
           CASE WHEN kdiku = '1016' THEN capaian ELSE 0 END,
           0,
           CASE WHEN kdiku = '1017' THEN capaian ELSE 0 END
    FROM tblrealikhk
    WHERE kdiku IN ('1015','1016','1017')
) AS z
GROUP BY id, tahun
ORDER BY id, tahun";

/// Environment quality (1024, 1025): targets against achievements per year.
pub const LINGKUNGAN_HIDUP_SQL: &str = "
SELECT tahun,
       SUM(target_iklh) AS target_iklh,
       SUM(iklh) AS iklh,
       SUM(target_penurunan_intensitas) AS target_penurunan_intensitas,
       SUM(penurunan_intensitas) AS penurunan_intensitas
FROM (
    SELECT tahun,
           CASE WHEN kdiku = '1024' THEN target ELSE 0 END AS target_iklh,
           0 AS iklh,
           CASE WHEN kdiku = '1025' THEN target ELSE 0 END AS target_penurunan_intensitas,
           0 AS penurunan_intensitas
    FROM tbltargetindikator
    WHERE kdiku IN ('1024','1025')
    UNION ALL
    SELECT tahun,
           0,
           CASE WHEN kdiku = '1024' THEN capaian ELSE 0 END,
           0,
           CASE WHEN kdiku = '1025' THEN capaian ELSE 0 END
    FROM tblrealikhk
    WHERE kdiku IN ('1024','1025')
) AS z
GROUP BY tahun
ORDER BY tahun";

/// Uninhabitable housing (1026): share of RTLH households per year.
pub const CAPAIAN_RTLH_SQL: &str = "
SELECT z.id, z.tahun,
       SUM(z.target) AS target,
       ROUND(SUM(z.capaian), 2) AS capaian
FROM (
    SELECT kdiku AS id, tahun, target, 0 AS capaian
    FROM tbltargetindikator
    WHERE kdiku = '1026'
    UNION
    SELECT '1026', tahun, 0,
           CASE WHEN COALESCE(SUM(jltotalrt), 0) = 0 THEN 0
                ELSE SUM(jlrtlh) / SUM(jltotalrt) * 100 END
    FROM tblrtlhkec
    GROUP BY tahun
) AS z
GROUP BY z.id, z.tahun
ORDER BY z.tahun";

/// Per-district RTLH listing.
pub const RTLH_SQL: &str = "
SELECT tahun, nmkecamatan AS kecamatan, jltotalrt AS jumlahkk, jlrtlh AS rtlh, presentasitlh AS persentase
FROM tblrtlhkec
ORDER BY kdkecamatan";

/// Regional competitiveness index: target and achievement per indicator and year.
pub const INDEX_DAYA_SAING_SQL: &str = "
SELECT ANY_VALUE(iddys) AS id,
       ANY_VALUE(nmdys) AS indikator,
       kdiku,
       ANY_VALUE(nmiku) AS nmiku,
       MAX(tahun) AS tahun,
       SUM(target) AS target,
       SUM(capaian) AS capaian
FROM tbltargetdayasaing
GROUP BY iddys, tahun, kdiku
ORDER BY tahun, kdiku";

/// Raw `(kdiku, tahun, target)` rows for the given codes, oldest year first.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn target_rows(pool: &MySqlPool, codes: &[&str]) -> Result<Vec<TargetRow>, StoreError> {
    let mut qb = QueryBuilder::<MySql>::new(
        "SELECT CAST(kdiku AS CHAR), CAST(tahun AS CHAR), CAST(target AS CHAR) FROM tbltargetindikator",
    );
    let codes: Vec<SqlValue> = codes.iter().map(|c| SqlValue::from(*c)).collect();
    push_where(&mut qb, &[Criterion::In("kdiku", codes)]);
    qb.push(" ORDER BY tahun ASC");
    let rows = qb.build().fetch_all(pool).await?;
    rows.iter()
        .map(|r| -> Result<TargetRow, StoreError> {
            Ok(TargetRow {
                kdiku: r.try_get::<Option<String>, _>(0)?.unwrap_or_default(),
                tahun: r.try_get::<Option<String>, _>(1)?.unwrap_or_default(),
                target: r.try_get::<Option<String>, _>(2)?,
            })
        })
        .collect()
}

/// Runs a fixed aggregation statement and decodes it with `mode`.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn run(pool: &MySqlPool, sql: &'static str, mode: NumericMode) -> Result<Vec<Value>, StoreError> {
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    Ok(rows_to_json(&rows, mode))
}

/// Composite infrastructure indicator table.
///
/// Output rows: `{id: string, indikator, tahun: number, target: number, capaian: number}`.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn infrastruktur(pool: &MySqlPool) -> Result<Vec<Value>, StoreError> {
    let rows = run(pool, INFRASTRUKTUR_SQL, NumericMode::Numbers).await?;
    Ok(rows.into_iter().map(shape_infrastruktur).collect())
}

fn shape_infrastruktur(row: Value) -> Value {
    let id = match &row["id"] {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    json!({
        "id": id,
        "indikator": row["indikator"].clone(),
        "tahun": numberish(row["tahun"].clone()),
        "target": numberish(row["target"].clone()),
        "capaian": numberish(row["capaian"].clone()),
    })
}

/// RTLH achievement with target and capaian as two-decimal text.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn capaian_rtlh(pool: &MySqlPool) -> Result<Vec<Value>, StoreError> {
    let rows = run(pool, CAPAIAN_RTLH_SQL, NumericMode::Numbers).await?;
    Ok(rows.into_iter().map(shape_capaian_rtlh).collect())
}

fn shape_capaian_rtlh(row: Value) -> Value {
    let two = |v: &Value| -> Value {
        numberish(v.clone())
            .as_f64()
            .and_then(fixed2)
            .map_or(Value::Null, Value::String)
    };
    let id = match &row["id"] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    json!({
        "id": id,
        "tahun": numberish(row["tahun"].clone()),
        "target": two(&row["target"]),
        "capaian": two(&row["capaian"]),
    })
}

/// Competitiveness index rows: `{id: string, indikator, kdiku, nmiku, tahun, target, capaian}`.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn index_daya_saing(pool: &MySqlPool) -> Result<Vec<Value>, StoreError> {
    let rows = run(pool, INDEX_DAYA_SAING_SQL, NumericMode::Numbers).await?;
    Ok(rows.into_iter().map(shape_index_daya_saing).collect())
}

fn shape_index_daya_saing(row: Value) -> Value {
    let id = match &row["id"] {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    json!({
        "id": id,
        "indikator": row["indikator"].clone(),
        "kdiku": row["kdiku"].clone(),
        "nmiku": row["nmiku"].clone(),
        "tahun": numberish(row["tahun"].clone()),
        "target": numberish(row["target"].clone()),
        "capaian": numberish(row["capaian"].clone()),
    })
}
