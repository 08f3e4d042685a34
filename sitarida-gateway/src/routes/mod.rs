//! Router assembly and the helpers shared by route modules.
//!
//! Every resource lives under `/api`. Probes sit at the root.

pub mod admin;
pub mod district_year;
pub mod fields;
pub mod finance;
pub mod health;
pub mod indicator;
pub mod irigasi;
pub mod jalan;
pub mod jembatan;
pub mod kesehatan;
pub mod penduduk;
pub mod record;
pub mod reference;
pub mod telekomunikasi;
pub mod users;
pub mod utility;
pub mod yearly;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{error::ApiError, state::AppState};

/// Trimmed query parameter; blank counts as absent.
pub(crate) fn trimmed(raw: Option<&String>) -> Option<&str> {
    raw.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Narrows an AUTO_INCREMENT id to the signed range used by every key.
pub(crate) fn insert_id(id: u64) -> Result<i64, ApiError> {
    i64::try_from(id).map_err(|_| ApiError::Internal(format!("insert id {id} out of range")))
}

fn infrastructure() -> Router<AppState> {
    Router::new()
        .route("/", get(indicator::infrastruktur))
        .route("/2jalanmantap", get(jalan::list).post(jalan::create))
        .route(
            "/2jalanmantap/{noruas}/{tahun}",
            get(jalan::get_item).put(jalan::put_item).delete(jalan::delete_item),
        )
        .route("/3jembatan", get(jembatan::list).post(jembatan::create))
        .route(
            "/3jembatan/{kdjembatan}/{tahun}",
            get(jembatan::get_item).put(jembatan::put_item).delete(jembatan::delete_item),
        )
        .route("/4irigasikondisibaik", get(irigasi::list).post(irigasi::create))
        .route("/4irigasikondisibaik-prev", get(irigasi::list_prev))
        .route(
            "/4irigasikondisibaik/{kdirigasi}/{tahun}",
            get(irigasi::get_item).put(irigasi::put_item).delete(irigasi::delete_item),
        )
        .route(
            "/5aksesairminum",
            get(utility::list_air_minum).post(utility::create_air_minum),
        )
        .route(
            "/5aksesairminum/{id}",
            get(utility::get_air_minum)
                .put(utility::put_air_minum)
                .delete(utility::delete_air_minum),
        )
        .route(
            "/6ketersediaanlistrik",
            get(utility::list_listrik).post(utility::create_listrik),
        )
        .route(
            "/6ketersediaanlistrik/{id}",
            get(utility::get_listrik).put(utility::put_listrik).delete(utility::delete_listrik),
        )
        .route(
            "/7telekomunikasi",
            get(telekomunikasi::list).post(telekomunikasi::create),
        )
        .route(
            "/7telekomunikasi/{kdtelekomunikasi}/{tahun}",
            get(telekomunikasi::get_item)
                .put(telekomunikasi::put_item)
                .delete(telekomunikasi::delete_item),
        )
}

fn health_sector() -> Router<AppState> {
    Router::new()
        .route("/", get(kesehatan::summary))
        .route(
            "/1usiaharapanhidup",
            get(kesehatan::list_kematian).post(kesehatan::create_kematian),
        )
        .route(
            "/3stunting",
            get(kesehatan::list_stunting).post(kesehatan::create_stunting),
        )
        .route(
            "/3stunting/{id}",
            get(kesehatan::get_stunting)
                .put(kesehatan::put_stunting)
                .delete(kesehatan::delete_stunting),
        )
}

fn references() -> Router<AppState> {
    use reference::{desa, irigasi, jalan, jembatan, kecamatan, opd};

    Router::new()
        .route("/ref-penduduk", get(penduduk::list).post(penduduk::create))
        .route(
            "/ref-penduduk/{id}",
            get(penduduk::get_item).put(penduduk::put_item).delete(penduduk::delete_item),
        )
        .route("/ref-kecamatan", get(kecamatan::list).post(kecamatan::create))
        .route(
            "/ref-kecamatan/{id}",
            get(kecamatan::get_item).put(kecamatan::put_item).delete(kecamatan::delete_item),
        )
        .route(
            "/tblperkapita",
            get(kecamatan::list_public).post(kecamatan::create_public),
        )
        .route("/ref-desa", get(desa::list).post(desa::create))
        .route(
            "/ref-desa/{id}",
            get(desa::get_item).put(desa::put_item).delete(desa::delete_item),
        )
        .route("/ref-opd", get(opd::list).post(opd::create))
        .route(
            "/ref-opd/{id}",
            get(opd::get_item).put(opd::put_item).delete(opd::delete_item),
        )
        .route("/ref-jalan", get(jalan::list).post(jalan::create))
        .route(
            "/ref-jalan/{id}",
            get(jalan::get_item).put(jalan::put_item).delete(jalan::delete_item),
        )
        .route("/ref-jembatan", get(jembatan::list).post(jembatan::create))
        .route(
            "/ref-jembatan/{id}",
            get(jembatan::get_item).put(jembatan::put_item).delete(jembatan::delete_item),
        )
        .route("/ref-irigasi", get(irigasi::list).post(irigasi::create))
        .route(
            "/ref-irigasi/{kdirigasi}",
            get(irigasi::get_item).put(irigasi::put_item).delete(irigasi::delete_item),
        )
}

fn indicators() -> Router<AppState> {
    Router::new()
        .route("/akip", get(indicator::akip).post(indicator::create_akip))
        .route("/akip/{id}", get(indicator::akip_item))
        .route("/capaianrtlh", get(indicator::capaian_rtlh))
        .route("/capaianrtlh/{id}", get(indicator::capaian_rtlh_item))
        .route("/lingkunganhidup", get(indicator::lingkungan_hidup))
        .route("/lingkunganhidup/{id}", get(indicator::lingkungan_hidup_item))
        .route("/kualitassdm", get(indicator::kualitas_sdm_summary))
        .route("/rtlh", get(indicator::rtlh))
        .route("/kesejahteraanmasyarakat", get(indicator::kesejahteraan))
        .route("/perkapita", get(indicator::perkapita))
        .route(
            "/indexdayasaing",
            get(indicator::index_daya_saing)
                .post(indicator::create_index_daya_saing)
                .put(indicator::put_index_daya_saing),
        )
        .route("/indexdayasaing/{id}", put(indicator::put_index_daya_saing))
        .route("/tblakip", get(indicator::tblakip).post(indicator::create_tblakip))
        .route("/tbltargetdayasaing", get(users::list).post(users::create))
        .route("/bpkpad/belanja", get(finance::belanja))
}

fn accounts() -> Router<AppState> {
    Router::new()
        .route("/login", get(admin::list).post(admin::create))
        .route(
            "/login/{id}",
            get(admin::get_item).put(admin::put_item).delete(admin::delete_item),
        )
        .route("/auth/login", post(admin::login))
        .route("/auth/logout", post(admin::logout))
        .route("/me", get(admin::me))
        .route("/admin", get(admin::session_list).post(admin::session_create))
}

/// Build the axum [`Router`] with all routes, tracing and CORS.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/infrastuktur", infrastructure())
        .nest("/keseheatanmasyarakat", health_sector())
        .merge(references())
        .merge(indicators())
        .merge(accounts());

    Router::new()
        .nest("/api", api)
        .route("/health", get(health::live))
        .route("/health/db", get(health::database))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
pub(crate) mod testkit {
    use axum::{
        body::Body,
        http::{request::Builder, Method, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::create_router;
    use crate::state::testing::state;

    /// Request builder for `uri`.
    pub fn request(method: Method, uri: &str) -> Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Runs one request through a fresh router; an empty body reads as `null`.
    pub async fn call(req: Request<Body>) -> (StatusCode, Value) {
        let resp = match create_router(state()).oneshot(req).await {
            Ok(r) => r,
            Err(e) => panic!("handler error: {e}"),
        };
        let status = resp.status();
        let bytes = match axum::body::to_bytes(resp.into_body(), 1 << 20).await {
            Ok(b) => b,
            Err(e) => panic!("failed to read body: {e}"),
        };
        if bytes.is_empty() {
            return (status, Value::Null);
        }
        match serde_json::from_slice(&bytes) {
            Ok(v) => (status, v),
            Err(e) => panic!("invalid JSON: {e}"),
        }
    }

    fn keyed(method: Method, uri: &str, key: Option<&str>) -> Builder {
        let builder = request(method, uri);
        match key {
            Some(k) => builder.header("x-api-key", k),
            None => builder,
        }
    }

    /// Sends a bodiless request, optionally with an `x-api-key`.
    pub async fn send(method: Method, uri: &str, key: Option<&str>) -> (StatusCode, Value) {
        match keyed(method, uri, key).body(Body::empty()) {
            Ok(req) => call(req).await,
            Err(e) => panic!("failed to build request: {e}"),
        }
    }

    /// Sends `body` as JSON, optionally with an `x-api-key`.
    pub async fn send_json(method: Method, uri: &str, key: Option<&str>, body: Value) -> (StatusCode, Value) {
        let req = keyed(method, uri, key)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()));
        match req {
            Ok(req) => call(req).await,
            Err(e) => panic!("failed to build request: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::testkit::send;
    use super::trimmed;
    use crate::state::testing::USERS_KEY;

    #[test]
    fn blank_parameters_are_absent() {
        assert_eq!(trimmed(Some(&"  ".to_owned())), None);
        assert_eq!(trimmed(Some(&" 2024 ".to_owned())), Some("2024"));
        assert_eq!(trimmed(None), None);
    }

    #[tokio::test]
    async fn any_key_routes_reject_a_missing_key() {
        for uri in [
            "/api/infrastuktur/2jalanmantap",
            "/api/infrastuktur/3jembatan",
            "/api/infrastuktur/4irigasikondisibaik",
            "/api/infrastuktur/7telekomunikasi",
            "/api/ref-kecamatan",
            "/api/ref-opd",
            "/api/ref-jalan",
            "/api/ref-jembatan",
            "/api/ref-irigasi",
            "/api/login",
        ] {
            let (status, body) = send(Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body, json!({"error": "Masukkan API KEY"}), "{uri}");
        }
    }

    #[tokio::test]
    async fn users_key_routes_reject_other_keys() {
        for uri in ["/api/login/1", "/api/akip/1", "/api/tbltargetdayasaing"] {
            let (status, body) = send(Method::GET, uri, Some("wrong")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["error"], "Unauthorized", "{uri}");
        }
        let (status, _) = send(Method::GET, "/api/akip/x", Some(USERS_KEY)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn users_key_routes_stay_closed_without_configured_keys() {
        use axum::body::Body;
        use tower::ServiceExt;

        use super::{create_router, testkit::request};
        use crate::state::testing::state_with;

        for uri in ["/api/akip/x", "/api/login/1", "/api/tbltargetdayasaing"] {
            let req = match request(Method::GET, uri).body(Body::empty()) {
                Ok(r) => r,
                Err(e) => panic!("failed to build request: {e}"),
            };
            let resp = match create_router(state_with(&[])).oneshot(req).await {
                Ok(r) => r,
                Err(e) => panic!("handler error: {e}"),
            };
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn unknown_paths_are_404() {
        let (status, _) = send(Method::GET, "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
