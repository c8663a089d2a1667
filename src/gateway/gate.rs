//! Access gate for protected endpoints and pages.
//!
//! Re-evaluated on every request: cookie -> token -> registry lookup. The
//! only state consulted is the session registry.

use super::responses::{error_reply, ApiReply};
use crate::auth::AuthError;
use super::AppState;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

/// Where unauthenticated page requests are sent.
pub const LOGIN_PAGE: &str = "/auth.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Unauthenticated,
    Authenticated(String),
}

/// Classify the request by its session cookie.
pub fn resolve(state: &AppState, headers: &HeaderMap) -> Access {
    state
        .cookie
        .read(headers)
        .and_then(|token| state.sessions.lookup(&token))
        .map_or(Access::Unauthenticated, Access::Authenticated)
}

/// Gate for JSON endpoints: 401 when unauthenticated.
pub fn require_api_session(state: &AppState, headers: &HeaderMap) -> Result<String, ApiReply> {
    match resolve(state, headers) {
        Access::Authenticated(username) => Ok(username),
        Access::Unauthenticated => {
            let message = if state.cookie.read(headers).is_some() {
                "invalid session; log in again"
            } else {
                "access denied; log in first"
            };
            Err(error_reply(&AuthError::Unauthenticated(message), false))
        }
    }
}

/// Gate for HTML pages: 302 to the login page when unauthenticated.
pub fn require_page_session(state: &AppState, headers: &HeaderMap) -> Result<String, Response> {
    match resolve(state, headers) {
        Access::Authenticated(username) => Ok(username),
        Access::Unauthenticated => {
            tracing::debug!("Page request redirected to login");
            Err((StatusCode::FOUND, [(header::LOCATION, LOGIN_PAGE)]).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_state;
    use axum::http::HeaderValue;
    use axum::Json;

    fn with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_cookie_is_unauthenticated() {
        let state = test_state();
        assert_eq!(resolve(&state, &HeaderMap::new()), Access::Unauthenticated);
    }

    #[test]
    fn empty_or_unknown_token_is_unauthenticated() {
        let state = test_state();
        assert_eq!(
            resolve(&state, &with_cookie("session=")),
            Access::Unauthenticated
        );
        assert_eq!(
            resolve(&state, &with_cookie("session=feedface")),
            Access::Unauthenticated
        );
    }

    #[test]
    fn known_token_is_authenticated() {
        let state = test_state();
        let token = state.sessions.create("alice");
        assert_eq!(
            resolve(&state, &with_cookie(&format!("session={token}"))),
            Access::Authenticated("alice".into())
        );
    }

    #[test]
    fn api_gate_returns_401_json() {
        let state = test_state();
        let (status, Json(body)) = require_api_session(&state, &HeaderMap::new()).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!body.success);
        assert_eq!(body.error.as_deref(), Some("access denied; log in first"));

        let (_, Json(body)) =
            require_api_session(&state, &with_cookie("session=stale")).unwrap_err();
        assert_eq!(body.error.as_deref(), Some("invalid session; log in again"));
    }

    #[test]
    fn page_gate_redirects_to_login() {
        let state = test_state();
        let response = require_page_session(&state, &with_cookie("session=stale")).unwrap_err();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            LOGIN_PAGE
        );
    }

    #[test]
    fn deleted_session_no_longer_passes() {
        let state = test_state();
        let token = state.sessions.create("alice");
        let headers = with_cookie(&format!("session={token}"));
        assert!(require_api_session(&state, &headers).is_ok());

        state.sessions.delete(&token);
        assert!(require_api_session(&state, &headers).is_err());
    }
}
