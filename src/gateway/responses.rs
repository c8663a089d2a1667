//! JSON bodies returned by the gateway.

use crate::auth::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

/// Uniform `{success, message?, error?}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            error: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Concrete return type for JSON handlers.
pub type ApiReply = (StatusCode, Json<ApiResponse>);

/// `GET /me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    pub logged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// `GET /check-username`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameAvailability {
    pub success: bool,
    pub available: bool,
    pub message: String,
}

/// `GET /hash`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashResponse {
    pub success: bool,
    pub hash: String,
}

/// HTTP status for each failure kind.
pub fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::AlreadyAuthenticated | AuthError::RegistrationDisabled => StatusCode::FORBIDDEN,
        AuthError::Conflict => StatusCode::CONFLICT,
        AuthError::NotFound | AuthError::IncorrectPassword | AuthError::Unauthenticated(_) => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::Hashing(crate::auth::HashingError::TooLong) => StatusCode::BAD_REQUEST,
        AuthError::Store(_) | AuthError::Hashing(_) | AuthError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Render an error as `(status, {success:false, error})`, logging
/// server-side failures with their full detail.
pub fn error_reply(err: &AuthError, distinct_login_errors: bool) -> ApiReply {
    let status = status_for(err);
    if err.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "Request rejected");
    }
    (
        status,
        Json(ApiResponse::err(err.public_message(distinct_login_errors))),
    )
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        error_reply(&self, false).into_response()
    }
}
