//! Store tests against a live SITARIDA schema.
//!
//! Run with `SITARIDA_TEST_DB_URL=mysql://... cargo test -- --ignored`.

use sitarida_core::{NumericMode, Patch, SqlValue};
use sitarida_store::pool::{self, PoolConfig};
use sitarida_store::query::{self, Criterion, Select};
use sitarida_store::{indicator, lookup, update_from_year, MySqlPool, StoreError, YearScope};

async fn pool() -> MySqlPool {
    let url = match std::env::var("SITARIDA_TEST_DB_URL") {
        Ok(u) => u,
        Err(e) => panic!("SITARIDA_TEST_DB_URL not set: {e}"),
    };
    match pool::connect(&PoolConfig::new(url)).await {
        Ok(p) => p,
        Err(e) => panic!("connect failed: {e}"),
    }
}

#[tokio::test]
#[ignore = "requires a MySQL instance at SITARIDA_TEST_DB_URL"]
async fn ping_round_trips() {
    let pool = pool().await;
    if let Err(e) = pool::ping(&pool).await {
        panic!("ping failed: {e}");
    }
}

#[tokio::test]
#[ignore = "requires a MySQL instance at SITARIDA_TEST_DB_URL"]
async fn refdesa_insert_duplicate_and_delete() {
    let pool = pool().await;
    let mut patch = Patch::new();
    patch.set("kddesa", 990_001_i64).set("nmdesa", "Desa Uji");
    let id = match query::insert(&pool, "refdesa", &patch).await {
        Ok(id) => id,
        Err(e) => panic!("insert failed: {e}"),
    };
    assert!(id > 0);

    let again = query::insert(&pool, "refdesa", &patch).await;
    assert!(matches!(again, Err(StoreError::Duplicate(_))), "kddesa is unique");

    let select = Select::new("id, kddesa, nmdesa", "refdesa").filter(Criterion::eq("kddesa", 990_001_i64));
    let row = match query::fetch_one(&pool, &select, NumericMode::JsonSafe).await {
        Ok(r) => r,
        Err(e) => panic!("fetch failed: {e}"),
    };
    assert_eq!(row["nmdesa"], "Desa Uji");

    let gone = match query::delete(&pool, "refdesa", &[Criterion::eq("kddesa", 990_001_i64)]).await {
        Ok(n) => n,
        Err(e) => panic!("delete failed: {e}"),
    };
    assert_eq!(gone, 1);
}

#[tokio::test]
#[ignore = "requires a MySQL instance at SITARIDA_TEST_DB_URL"]
async fn infrastructure_indicator_rows_have_numeric_fields() {
    let pool = pool().await;
    let rows = match indicator::infrastruktur(&pool).await {
        Ok(r) => r,
        Err(e) => panic!("query failed: {e}"),
    };
    for row in rows {
        assert!(row["id"].is_string());
        assert!(row["tahun"].is_number() || row["tahun"].is_null());
    }
}

#[tokio::test]
#[ignore = "requires a MySQL instance at SITARIDA_TEST_DB_URL"]
async fn unknown_kecamatan_has_no_name() {
    let pool = pool().await;
    let name = match lookup::kecamatan_name(&pool, "999999999").await {
        Ok(n) => n,
        Err(e) => panic!("lookup failed: {e}"),
    };
    assert_eq!(name, None);
}

async fn seed_telekomunikasi(pool: &MySqlPool, kd: &str, tahun: i64, total: i64) {
    let mut patch = Patch::new();
    patch
        .set("kdtelekomunikasi", kd)
        .set("tahun", tahun)
        .set("totaldesa", total)
        .set("desaterlayani", 1_i64);
    if let Err(e) = query::insert(pool, "tblikucakupantelekomunikasi", &patch).await {
        panic!("seed {tahun} failed: {e}");
    }
}

async fn totaldesa(pool: &MySqlPool, kd: &str, tahun: i64) -> i64 {
    let select = Select::new("totaldesa", "tblikucakupantelekomunikasi")
        .filter(Criterion::eq("kdtelekomunikasi", kd))
        .filter(Criterion::eq("tahun", tahun));
    match query::fetch_one(pool, &select, NumericMode::Numbers).await {
        Ok(row) => row["totaldesa"].as_i64().unwrap_or_default(),
        Err(e) => panic!("fetch {tahun} failed: {e}"),
    }
}

#[tokio::test]
#[ignore = "requires a MySQL instance at SITARIDA_TEST_DB_URL"]
async fn bulk_update_covers_the_year_and_later_only() {
    const KD: &str = "LIVE-BULK";
    let pool = pool().await;
    let cleanup = [Criterion::eq("kdtelekomunikasi", KD)];
    if let Err(e) = query::delete(&pool, "tblikucakupantelekomunikasi", &cleanup).await {
        panic!("cleanup failed: {e}");
    }
    seed_telekomunikasi(&pool, KD, 2023, 10).await;
    seed_telekomunikasi(&pool, KD, 2024, 10).await;

    let scope = YearScope {
        table: "tblikucakupantelekomunikasi",
        key: "kdtelekomunikasi",
        value: SqlValue::Text(KD.to_owned()),
        tahun_gte: 2024,
    };
    let mut patch = Patch::new();
    patch.set("totaldesa", 25_i64);
    let sample = Select::new("kdtelekomunikasi, tahun, totaldesa", "tblikucakupantelekomunikasi");
    let outcome = match update_from_year(&pool, &scope, &patch, Some(sample)).await {
        Ok(o) => o,
        Err(e) => panic!("bulk update failed: {e}"),
    };
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.sample.map(|s| s["totaldesa"].clone()), Some(serde_json::json!(25)));
    assert_eq!(totaldesa(&pool, KD, 2023).await, 10);
    assert_eq!(totaldesa(&pool, KD, 2024).await, 25);

    let later = YearScope { tahun_gte: 2030, ..scope.clone() };
    let none = update_from_year(&pool, &later, &patch, None).await;
    assert!(matches!(none, Err(StoreError::NotFound)), "empty scope is not found");

    let other = YearScope { value: SqlValue::Text("LIVE-NONE".to_owned()), ..scope };
    let none = update_from_year(&pool, &other, &patch, None).await;
    assert!(matches!(none, Err(StoreError::NotFound)), "unknown key is not found");

    if let Err(e) = query::delete(&pool, "tblikucakupantelekomunikasi", &cleanup).await {
        panic!("cleanup failed: {e}");
    }
}
