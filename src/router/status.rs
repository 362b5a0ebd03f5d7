//! Public server status and metrics.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Structured configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    version: String,
    name: String,
}

/// Public server status (configuration).
pub async fn handler(State(state): State<AppState>) -> Json<Status> {
    Json(Status {
        version: state.config.version().to_owned(),
        name: state.config.name.clone(),
    })
}

/// Prometheus metrics, when enabled.
pub async fn metrics(
    State(state): State<AppState>,
) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(StatusCode::NOT_FOUND)
}
