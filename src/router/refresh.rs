//! Extend a live session.

use axum::extract::State;
use axum::http::StatusCode;
use tower_cookies::Cookies;

use crate::AppState;
use crate::error::Result;

/// Handler replacing the session cookie with a fresh token.
pub async fn handler(
    State(state): State<AppState>,
    mut cookies: Cookies,
) -> Result<StatusCode> {
    state
        .sessions
        .refresh(&state.config.token.secret, &mut cookies)?;

    Ok(StatusCode::NO_CONTENT)
}
