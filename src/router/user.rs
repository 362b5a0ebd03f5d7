//! Who is signed in.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::AppState;
use crate::error::Result;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub subject: String,
}

/// Handler returning the subject of the current session.
pub async fn handler(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<Response>> {
    let subject = state
        .sessions
        .validate(&state.config.token.secret, &cookies)?;

    Ok(Json(Response { subject }))
}
