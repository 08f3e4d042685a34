//! Liveness and database readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use sitarida_store::pool;

use crate::state::AppState;

/// `GET /health`
pub async fn live() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /health/db` — runs `SELECT 1` against the pool.
pub async fn database(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match pool::ping(&state.pool).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!(error = %e, "database ping failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "error": "database unavailable" })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testkit::send;

    #[tokio::test]
    async fn liveness_needs_no_database() {
        let (status, body) = send(Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }
}
