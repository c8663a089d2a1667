//! Session cookie parsing and `Set-Cookie` rendering.

use axum::http::header::{self, HeaderMap, HeaderValue, InvalidHeaderValue};
use cookie::time::Duration;
use cookie::{Cookie, SameSite};

/// Name and lifetime of the session cookie.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub max_age_secs: u64,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "session".into(),
            max_age_secs: 3600,
        }
    }
}

impl CookieSettings {
    /// Value of the first cookie called `self.name` across all `Cookie`
    /// headers. An empty value counts as absent; malformed pairs are skipped.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.name)
            .map(|cookie| cookie.value().to_owned())
            .filter(|value| !value.is_empty())
    }

    /// `Set-Cookie` value that hands `token` to the browser.
    pub fn issue(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let max_age = i64::try_from(self.max_age_secs).unwrap_or(i64::MAX);
        let cookie = self
            .session_cookie(token.to_owned())
            .max_age(Duration::seconds(max_age))
            .build();
        HeaderValue::from_str(&cookie.to_string())
    }

    /// `Set-Cookie` value that makes the browser drop the cookie.
    pub fn clear(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = self.session_cookie(String::new()).build();
        cookie.make_removal();
        HeaderValue::from_str(&cookie.to_string())
    }

    fn session_cookie(&self, value: String) -> cookie::CookieBuilder<'static> {
        Cookie::build((self.name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
    }
}
