//! Session lifecycle: issue, validate, refresh and revoke the `token` cookie.
//!
//! Sessions are stateless. Everything needed to authenticate a request lives
//! in the signed token, and the secret is handed in on every call.
//!
//! Revoking only clears the cookie. A token string captured beforehand stays
//! cryptographically valid until its natural expiry.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config;
use crate::cookie::{self, CookieStore, TOKEN_COOKIE};
use crate::error::{Error, Result};
use crate::token::{Claims, TokenSigner};

/// A freshly minted session token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub claims: Claims,
    pub token: String,
}

/// Manage session tokens carried by cookies.
#[derive(Clone)]
pub struct SessionManager {
    signer: Arc<dyn TokenSigner>,
    clock: Arc<dyn Clock>,
    cookie: Arc<config::Cookie>,
}

impl SessionManager {
    /// Create a new [`SessionManager`] with default cookie attributes.
    pub fn new(signer: Arc<dyn TokenSigner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer,
            clock,
            cookie: Arc::new(config::Cookie::default()),
        }
    }

    /// Set attributes written on every `token` cookie.
    pub fn with_cookie(mut self, cookie: config::Cookie) -> Self {
        self.cookie = Arc::new(cookie);
        self
    }

    /// Sign a token for `subject` valid `ttl` seconds and write it to
    /// `cookies`.
    ///
    /// Nothing is written when signing fails.
    pub fn issue(
        &self,
        subject: &str,
        secret: impl AsRef<[u8]>,
        ttl: i64,
        cookies: &mut impl CookieStore,
    ) -> Result<Session> {
        let result = self.mint(subject, secret.as_ref(), ttl, cookies);
        record("issue", &result);
        result
    }

    /// Return the subject of the session carried by `cookies`.
    pub fn validate(
        &self,
        secret: impl AsRef<[u8]>,
        cookies: &impl CookieStore,
    ) -> Result<String> {
        let result = self
            .authenticate(secret.as_ref(), cookies)
            .map(|claims| claims.sub);
        record("validate", &result);
        result
    }

    /// Replace a live session with a new token of the same duration.
    ///
    /// The new token expires `exp - iat` seconds from now, so a session slides
    /// forward on each refresh. Expired tokens are never renewed.
    pub fn refresh(
        &self,
        secret: impl AsRef<[u8]>,
        cookies: &mut impl CookieStore,
    ) -> Result<Session> {
        let secret = secret.as_ref();
        let result = self.authenticate(secret, cookies).and_then(|claims| {
            self.mint(&claims.sub, secret, claims.ttl(), cookies)
        });
        record("refresh", &result);
        result
    }

    /// Tell the client to drop its session cookie.
    pub fn revoke(&self, cookies: &mut impl CookieStore) {
        cookies.set(cookie::build(
            &self.cookie,
            String::default(),
            time::OffsetDateTime::UNIX_EPOCH,
        ));

        tracing::debug!("session revoked");
        metrics::counter!("sessions_total", "operation" => "revoke", "outcome" => "ok")
            .increment(1);
    }

    fn mint(
        &self,
        subject: &str,
        secret: &[u8],
        ttl: i64,
        cookies: &mut impl CookieStore,
    ) -> Result<Session> {
        let claims = Claims::new(subject, self.clock.now(), ttl)?;
        let expires =
            cookie::expiration(claims.exp).ok_or(Error::InvalidTtl(ttl))?;

        let token = self.signer.sign(&claims, secret)?;
        cookies.set(cookie::build(&self.cookie, token.clone(), expires));

        tracing::debug!(subject, exp = claims.exp, "session token issued");

        Ok(Session { claims, token })
    }

    fn authenticate(
        &self,
        secret: &[u8],
        cookies: &impl CookieStore,
    ) -> Result<Claims> {
        self.check(secret, cookies).inspect_err(|err| {
            tracing::warn!(kind = err.kind(), error = %err, "session token rejected");
        })
    }

    fn check(&self, secret: &[u8], cookies: &impl CookieStore) -> Result<Claims> {
        let token = cookies
            .get(TOKEN_COOKIE)
            .filter(|token| !token.is_empty())
            .ok_or(Error::MissingToken)?;

        let claims = self.signer.verify(&token, secret)?;
        if claims.is_expired(self.clock.now()) {
            return Err(Error::ExpiredToken);
        }

        Ok(claims)
    }
}

fn record<T>(operation: &'static str, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };

    metrics::counter!("sessions_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}
