use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gridiron_core::GridironError;
use gridiron_storage::PersistenceError;
use serde_json::json;

/// JSON error body `{"error": kind, "detail": message}` with its status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    detail: String,
}

impl ApiError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<GridironError> for ApiError {
    fn from(err: GridironError) -> Self {
        let status = match err {
            GridironError::Validation(_) => StatusCode::BAD_REQUEST,
            GridironError::UnknownStat(_) => StatusCode::NOT_FOUND,
            GridironError::BackendFetch(_) => StatusCode::BAD_GATEWAY,
            GridironError::Persistence(_) | GridironError::Migration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            kind: err.kind(),
            detail: err.detail().to_string(),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        GridironError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(kind = self.kind, detail = %self.detail, "request failed");
        }
        (
            self.status,
            Json(json!({ "error": self.kind, "detail": self.detail })),
        )
            .into_response()
    }
}
