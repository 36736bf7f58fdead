//! Dispatch trigger route, invoked by an external scheduler or webhook.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use wayfarer_common::error::AppError;
use wayfarer_notifier::DispatchOutcome;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/notifications/dispatch", post(dispatch_notifications))
}

/// Result payload of one dispatch invocation.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<DispatchOutcome> for DispatchResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Idle => Self {
                success: true,
                sent: Some(0),
                failed: None,
                total: None,
                message: Some("No pending notifications".to_string()),
            },
            DispatchOutcome::Completed(summary) => Self {
                success: true,
                sent: Some(summary.sent),
                failed: Some(summary.failed),
                total: Some(summary.total),
                message: None,
            },
        }
    }
}

/// POST /api/notifications/dispatch: drain one batch of the notification queue.
///
/// Failures are reported as a 500 with `{ "success": false, "error": ... }`.
async fn dispatch_notifications(
    State(state): State<AppState>,
) -> Result<Json<DispatchResponse>, AppError> {
    let outcome = state.dispatcher.run().await.map_err(|e| {
        tracing::error!(error = %e, "Dispatch invocation failed");
        AppError::from(e)
    })?;

    Ok(Json(outcome.into()))
}
