//! Cookie channel carrying the session token.

use time::OffsetDateTime;
use tower_cookies::cookie::{CookieJar, SameSite as CookieSameSite};
use tower_cookies::{Cookie, Cookies};

use crate::config::{self, SameSite};

/// Name of the cookie holding the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Somewhere session cookies are read from and written to.
pub trait CookieStore {
    /// Value of the cookie named `name`, if any.
    fn get(&self, name: &str) -> Option<String>;

    /// Write `cookie`, replacing any cookie with the same name.
    fn set(&mut self, cookie: Cookie<'static>);
}

impl CookieStore for Cookies {
    fn get(&self, name: &str) -> Option<String> {
        Cookies::get(self, name).map(|cookie| cookie.value().to_owned())
    }

    fn set(&mut self, cookie: Cookie<'static>) {
        self.add(cookie);
    }
}

impl CookieStore for CookieJar {
    fn get(&self, name: &str) -> Option<String> {
        CookieJar::get(self, name).map(|cookie| cookie.value().to_owned())
    }

    fn set(&mut self, cookie: Cookie<'static>) {
        self.add(cookie);
    }
}

/// Convert a Unix timestamp into a cookie `Expires` date.
///
/// Returns `None` when the timestamp is outside the representable range.
pub fn expiration(timestamp: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(timestamp).ok()
}

impl From<SameSite> for CookieSameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Strict => CookieSameSite::Strict,
            SameSite::Lax => CookieSameSite::Lax,
            SameSite::None => CookieSameSite::None,
        }
    }
}

/// Build the `token` cookie with configured attributes.
pub fn build(
    attributes: &config::Cookie,
    value: String,
    expires: OffsetDateTime,
) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .path(attributes.path.clone())
        .http_only(attributes.http_only)
        .secure(attributes.secure)
        .same_site(attributes.same_site.into())
        .expires(expires)
        .build()
}
