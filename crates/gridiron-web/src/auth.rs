use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Lets the request through when no key is configured or `X-API-Key` matches.
pub(crate) async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented == Some(expected) {
        return next.run(request).await;
    }
    tracing::warn!(path = %request.uri().path(), "rejected request without a valid api key");
    (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" }))).into_response()
}
