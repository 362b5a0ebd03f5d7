//! Sign out.

use axum::extract::State;
use axum::http::StatusCode;
use tower_cookies::Cookies;

use crate::AppState;

/// Handler clearing the session cookie. Always succeeds.
pub async fn handler(
    State(state): State<AppState>,
    mut cookies: Cookies,
) -> StatusCode {
    state.sessions.revoke(&mut cookies);

    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use tower_cookies::cookie::CookieJar;

    use crate::clock::FixedClock;
    use crate::router::auth::tests::{NOW, set_cookie};
    use crate::*;

    #[tokio::test]
    async fn test_signout_handler() {
        let state = test_state(Arc::new(FixedClock::new(NOW)));
        let token = state
            .sessions
            .issue("user123", &state.config.token.secret, 3600, &mut CookieJar::new())
            .unwrap()
            .token;

        for token in [Some(token.as_str()), None] {
            let response = make_request(
                app(state.clone()),
                Method::POST,
                "/signout",
                token,
                String::default(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);

            let cookie = set_cookie(&response);
            assert_eq!(cookie.value(), "");
            assert_eq!(
                cookie.expires_datetime(),
                Some(time::OffsetDateTime::UNIX_EPOCH)
            );
        }
    }
}
