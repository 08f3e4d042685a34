//! End-to-end API tests against a live SITARIDA schema.
//!
//! Run with: `SITARIDA_TEST_DB_URL=mysql://... cargo test --test live_api -- --ignored`

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sitarida_gateway::{config::Config, routes::create_router, state::AppState};
use sitarida_store::pool::{self, PoolConfig};
use tower::ServiceExt;

const KEY: &str = "live-users-key";

async fn app() -> Router {
    let url = match std::env::var("SITARIDA_TEST_DB_URL") {
        Ok(u) => u,
        Err(e) => panic!("SITARIDA_TEST_DB_URL not set: {e}"),
    };
    let vars: HashMap<&str, &str> = [
        ("SITARIDA_DB_URL", url.as_str()),
        ("API_KEY_USERS", KEY),
        ("JWT_SECRET", "live-secret"),
        ("SALT_ROUNDS", "4"),
    ]
    .into_iter()
    .collect();
    let config = match Config::from_map(&vars) {
        Ok(c) => c,
        Err(e) => panic!("config failed: {e}"),
    };
    let pool = match pool::connect(&PoolConfig::new(url.clone())).await {
        Ok(p) => p,
        Err(e) => panic!("connect failed: {e}"),
    };
    create_router(AppState::new(pool, config))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", KEY)
        .header("content-type", "application/json");
    let req = match builder.body(body.map_or_else(Body::empty, |b| Body::from(b.to_string()))) {
        Ok(r) => r,
        Err(e) => panic!("failed to build request: {e}"),
    };
    let resp = match app.clone().oneshot(req).await {
        Ok(r) => r,
        Err(e) => panic!("handler error: {e}"),
    };
    let status = resp.status();
    let bytes = match axum::body::to_bytes(resp.into_body(), 1 << 22).await {
        Ok(b) => b,
        Err(e) => panic!("failed to read body: {e}"),
    };
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => panic!("invalid JSON: {e}"),
        }
    };
    (status, value)
}

#[tokio::test]
#[ignore = "requires a MySQL instance at SITARIDA_TEST_DB_URL"]
async fn database_probe_is_ok() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/health/db", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
#[ignore = "requires a MySQL instance at SITARIDA_TEST_DB_URL"]
async fn village_lifecycle() {
    let app = app().await;
    let (status, created) = call(
        &app,
        Method::POST,
        "/api/ref-desa",
        Some(json!({"kddesa": 990_002, "nmdesa": "Desa Uji"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = match created["id"].as_i64() {
        Some(id) => id,
        None => panic!("no id in {created}"),
    };

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/ref-desa",
        Some(json!({"kddesa": 990_002, "nmdesa": "Desa Uji"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/ref-desa/{id}");
    let (status, updated) = call(&app, Method::PUT, &uri, Some(json!({"nmdesa": "Desa Uji Baru"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["nmdesa"], "Desa Uji Baru");

    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a MySQL instance at SITARIDA_TEST_DB_URL"]
async fn composite_infrastructure_rows_are_shaped() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/api/infrastuktur", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = match body.as_array() {
        Some(r) => r,
        None => panic!("expected array, got {body}"),
    };
    for row in rows {
        assert!(row["id"].is_string(), "id is text: {row}");
        assert!(row["tahun"].is_number(), "tahun is numeric: {row}");
    }
}

#[tokio::test]
#[ignore = "requires a MySQL instance at SITARIDA_TEST_DB_URL"]
async fn admin_sign_in_sets_a_cookie() {
    let app = app().await;
    let username = "live-test-operator";
    let (status, created) = call(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({"username": username, "password": "rahasia", "nmpengguna": "Operator Uji"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert!(created.get("password").is_none());

    let req = match Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(json!({"username": username, "password": "rahasia"}).to_string()))
    {
        Ok(r) => r,
        Err(e) => panic!("failed to build request: {e}"),
    };
    let resp = match app.clone().oneshot(req).await {
        Ok(r) => r,
        Err(e) => panic!("handler error: {e}"),
    };
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(cookie.starts_with("token="), "{cookie}");

    let uri = format!("/api/login/{}", created["id"]);
    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a MySQL instance at SITARIDA_TEST_DB_URL"]
async fn telecom_update_applies_from_the_year_onward() {
    const BASE: &str = "/api/infrastuktur/7telekomunikasi";
    let app = app().await;
    for tahun in [2023, 2024] {
        let _ = call(&app, Method::DELETE, &format!("{BASE}/LIVE-API/{tahun}"), None).await;
        let body = json!({
            "kdtelekomunikasi": "LIVE-API",
            "tahun": tahun,
            "total_desa": 10,
            "desa_terlayani": 4,
            "username": "live-test",
        });
        let (status, created) = call(&app, Method::POST, BASE, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
    }

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("{BASE}/LIVE-API/2024"),
        Some(json!({"totaldesa": 30, "username": "live-test"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ok"], true);
    assert_eq!(body["updated"], 1);
    assert_eq!(body["scope"], json!({"kdtelekomunikasi": "LIVE-API", "tahun_gte": 2024}));
    assert_eq!(body["applied"]["totaldesa"], 30);
    assert_eq!(body["applied"]["aksi"], "EDIT");

    let (status, earlier) = call(&app, Method::GET, &format!("{BASE}/LIVE-API/2023"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(earlier["totaldesa"], 10);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("{BASE}/LIVE-API/2030"),
        Some(json!({"totaldesa": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Tidak ada baris yang cocok (periksa kdtelekomunikasi/tahun)");

    for tahun in [2023, 2024] {
        let (status, _) = call(&app, Method::DELETE, &format!("{BASE}/LIVE-API/{tahun}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
