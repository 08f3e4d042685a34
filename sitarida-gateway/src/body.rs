//! Lenient JSON bodies and audit helpers.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::HeaderMap,
    Json,
};
use serde_json::{Map, Value};
use sitarida_core::coerce;

/// Request body as a JSON object.
///
/// A missing, unparsable or non-object body reads as `{}` so handlers answer
/// with their own validation messages.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let parsed: Result<Json<Value>, JsonRejection> = Json::from_request(req, state).await;
        let value = match parsed {
            Ok(Json(v @ Value::Object(_))) => v,
            Ok(_) => Value::Object(Map::new()),
            Err(e) => {
                tracing::debug!(error = %e, "unreadable json body");
                Value::Object(Map::new())
            }
        };
        Ok(JsonBody(value))
    }
}

impl JsonBody {
    /// `true` when the body has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.as_object().is_none_or(Map::is_empty)
    }
}

const USER_HEADERS: [&str; 3] = ["x-username", "x-user", "x-api-user"];

/// Operator name for audit columns: body `username`, then the user headers.
#[must_use]
pub fn audit_username(body: &Value, headers: &HeaderMap) -> Option<String> {
    coerce::opt_str(body, "username").or_else(|| {
        USER_HEADERS.iter().find_map(|h| {
            headers
                .get(*h)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        })
    })
}

/// Current UTC time, without offset, for `datecreate` columns.
#[must_use]
pub fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
