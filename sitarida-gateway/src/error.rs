//! Error types for the gateway crate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use sitarida_core::CoreError;
use sitarida_store::StoreError;

/// Message sent for unexpected server-side failures.
pub const SERVER_ERROR: &str = "Terjadi kesalahan server";

/// Errors that can occur during request handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Missing or wrong credentials.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// The request is malformed or fails validation.
    #[error("{0}")]
    BadRequest(String),

    /// The addressed row does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness or reference rule would be broken.
    #[error("{0}")]
    Conflict(String),

    /// `{"error": message, ...extra}` with an arbitrary status.
    #[error("{message}")]
    Detailed {
        /// Response status.
        status: StatusCode,
        /// Value of the `error` key.
        message: String,
        /// Fields appended after `error`.
        extra: Map<String, Value>,
    },

    /// A fully shaped JSON body.
    #[error("{1}")]
    Body(StatusCode, Value),

    /// A store failure; unclassified ones answer 500 with `fallback`.
    #[error("{fallback}: {source}")]
    Store {
        /// Underlying error.
        #[source]
        source: StoreError,
        /// Client-facing message for 500 responses.
        fallback: &'static str,
    },

    /// Any other server-side failure. The message is logged, not sent.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// 400 with `{"error": message, ...extra}`.
    #[must_use]
    pub fn bad_request_with(message: impl Into<String>, extra: Map<String, Value>) -> Self {
        Self::Detailed {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            extra,
        }
    }

    /// 409 with `{"error": message, ...extra}`.
    #[must_use]
    pub fn conflict_with(message: impl Into<String>, extra: Map<String, Value>) -> Self {
        Self::Detailed {
            status: StatusCode::CONFLICT,
            message: message.into(),
            extra,
        }
    }

    /// Status and client-facing message; logs server-side failures.
    fn parts(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, (*m).to_owned()),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            ApiError::Detailed { status, message, .. } => (*status, message.clone()),
            ApiError::Body(status, body) => {
                let m = body
                    .get("error")
                    .or_else(|| body.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                (*status, m.to_owned())
            }
            ApiError::Store { source, fallback } => match source {
                StoreError::NotFound => (StatusCode::NOT_FOUND, "Data tidak ditemukan".to_owned()),
                StoreError::Duplicate(_) => (StatusCode::CONFLICT, "Data sudah ada".to_owned()),
                StoreError::ForeignKey(_) => (
                    StatusCode::CONFLICT,
                    "Tidak dapat menghapus data karena masih digunakan".to_owned(),
                ),
                other => {
                    tracing::error!(error = %other, "store failure");
                    (StatusCode::INTERNAL_SERVER_ERROR, (*fallback).to_owned())
                }
            },
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR.to_owned())
            }
        }
    }

    /// Replaces the default `{"error": ...}` body with `shape(message)`.
    #[must_use]
    pub fn reshape(self, shape: impl FnOnce(String) -> Value) -> Self {
        if let ApiError::Body(..) = self {
            return self;
        }
        let (status, message) = self.parts();
        ApiError::Body(status, shape(message))
    }

    /// `{"message": ...}` bodies.
    #[must_use]
    pub fn message_keyed(self) -> Self {
        self.reshape(|m| json!({ "message": m }))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Body(status, body) => (status, Json(body)).into_response(),
            ApiError::Detailed { status, message, extra } => {
                let mut body = Map::new();
                body.insert("error".to_owned(), Value::String(message));
                body.extend(extra);
                (status, Json(Value::Object(body))).into_response()
            }
            other => {
                let (status, message) = other.parts();
                (status, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(source: StoreError) -> Self {
        ApiError::Store {
            source,
            fallback: SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Attaches a client-facing 500 message to store results.
pub trait Context<T> {
    /// Wraps the error in [`ApiError::Store`] with `fallback`.
    ///
    /// # Errors
    /// Returns the wrapped error when `self` is `Err`.
    fn context(self, fallback: &'static str) -> Result<T, ApiError>;
}

impl<T> Context<T> for Result<T, StoreError> {
    fn context(self, fallback: &'static str) -> Result<T, ApiError> {
        self.map_err(|source| ApiError::Store { source, fallback })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(resp: Response) -> Value {
        let bytes = match axum::body::to_bytes(resp.into_body(), 4096).await {
            Ok(b) => b,
            Err(e) => panic!("failed to read body: {e}"),
        };
        match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => panic!("invalid JSON: {e}"),
        }
    }

    #[test]
    fn status_codes_map_correctly() {
        let cases = [
            (ApiError::Unauthorized("Unauthorized"), StatusCode::UNAUTHORIZED),
            (ApiError::BadRequest("x".to_owned()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("x".to_owned()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".to_owned()), StatusCode::CONFLICT),
            (ApiError::Internal("boom".to_owned()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn store_errors_are_classified() {
        let resp = ApiError::from(StoreError::Duplicate("k".to_owned())).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = ApiError::from(StoreError::NotFound).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = ApiError::from(StoreError::Unscoped("delete")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn server_failures_send_the_fallback_only() {
        let err: Result<(), _> = Err(StoreError::Unscoped("update"));
        let resp = match err.context("Gagal update data") {
            Ok(()) => panic!("expected error"),
            Err(e) => e.into_response(),
        };
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(resp).await, json!({"error": "Gagal update data"}));
    }

    #[tokio::test]
    async fn detailed_keeps_error_first() {
        let mut extra = Map::new();
        extra.insert("existingData".to_owned(), json!({"id": 3}));
        let resp = ApiError::conflict_with("Data sudah ada", extra).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = body_of(resp).await;
        let keys: Vec<&String> = match body.as_object() {
            Some(o) => o.keys().collect(),
            None => panic!("expected object"),
        };
        assert_eq!(keys, ["error", "existingData"]);
    }

    #[tokio::test]
    async fn message_keyed_changes_the_key() {
        let resp = ApiError::NotFound("Data tidak ditemukan.".to_owned())
            .message_keyed()
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(resp).await, json!({"message": "Data tidak ditemukan."}));
    }

    #[test]
    fn core_errors_are_bad_requests() {
        let err = ApiError::from(CoreError::InvalidDecimal { raw: "1,2,3".to_owned() });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
