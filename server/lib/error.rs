use axum::{
    http::StatusCode,
    response::{ IntoResponse, Response },
    Json,
};
use serde_json::json;
use tdse::error::SolveError;
use tokio::task::JoinError;

/// A failed request, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl From<SolveError> for ApiError {
    fn from(err: SolveError) -> Self {
        let status
            = if err.kind().is_client_error() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
        Self { status, detail: err.to_string() }
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: format!("solver task failed: {err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
