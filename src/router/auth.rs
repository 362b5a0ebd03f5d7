//! Open a session for an already authenticated subject.

use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Subject must contain between 1 and 255 characters."
    ))]
    pub subject: String,
    /// Session duration in seconds. Configured `token.ttl` when missing.
    #[validate(range(min = 1, message = "TTL must be positive."))]
    pub ttl: Option<i64>,
}

/// Handler to issue a session cookie.
pub async fn handler(
    State(state): State<AppState>,
    mut cookies: Cookies,
    Valid(body): Valid<Body>,
) -> Result<StatusCode> {
    let ttl = body.ttl.unwrap_or(state.config.token.ttl);

    state.sessions.issue(
        &body.subject,
        &state.config.token.secret,
        ttl,
        &mut cookies,
    )?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
pub(super) mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode, header};
    use serde_json::json;
    use tower_cookies::Cookie;

    use crate::clock::FixedClock;
    use crate::token::TokenSigner;
    use crate::*;

    pub const NOW: i64 = 1_700_000_000;

    /// Extract the `token` cookie set on a response.
    pub fn set_cookie(
        response: &axum::http::Response<axum::body::Body>,
    ) -> Cookie<'static> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| Cookie::parse(value.to_owned()).ok())
            .find(|cookie| cookie.name() == cookie::TOKEN_COOKIE)
            .expect("missing `token` cookie")
    }

    #[tokio::test]
    async fn test_auth_handler() {
        let state = test_state(Arc::new(FixedClock::new(NOW)));
        let app = app(state.clone());

        let response = make_request(
            app,
            Method::POST,
            "/auth",
            None,
            json!({ "subject": "user123" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let cookie = set_cookie(&response);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(
            cookie.expires_datetime(),
            cookie::expiration(NOW + state.config.token.ttl)
        );

        let claims = token::HmacSigner::default()
            .verify(cookie.value(), state.config.token.secret.as_bytes())
            .unwrap();
        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.ttl(), state.config.token.ttl);
    }

    #[tokio::test]
    async fn test_auth_custom_ttl() {
        let state = test_state(Arc::new(FixedClock::new(NOW)));
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/auth",
            None,
            json!({ "subject": "user123", "ttl": 60 }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            set_cookie(&response).expires_datetime(),
            cookie::expiration(NOW + 60)
        );
    }

    #[tokio::test]
    async fn test_auth_invalid_body() {
        let state = test_state(Arc::new(FixedClock::new(NOW)));

        for body in [
            json!({ "subject": "" }),
            json!({ "subject": "user123", "ttl": 0 }),
            json!({ "ttl": 60 }),
        ] {
            let response = make_request(
                app(state.clone()),
                Method::POST,
                "/auth",
                None,
                body.to_string(),
            )
            .await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(response.headers().get(header::SET_COOKIE).is_none());
        }
    }
}
