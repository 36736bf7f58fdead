use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Dispatch(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = json!({ "success": false, "error": message });
        (status, Json(body)).into_response()
    }
}
