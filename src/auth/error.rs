use super::password::HashingError;
use super::store::StoreError;
use thiserror::Error;

/// Message shown for both unknown users and wrong passwords unless
/// `auth.distinct_login_errors` is enabled.
pub const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Everything a registration, login or gated request can fail with.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or blank input field.
    #[error("{0}")]
    Validation(String),

    #[error("already logged in; log out before registering another user")]
    AlreadyAuthenticated,

    #[error("registration is disabled")]
    RegistrationDisabled,

    #[error("username or email already registered")]
    Conflict,

    /// Login named a user that does not exist.
    #[error("user not found")]
    NotFound,

    #[error("incorrect password")]
    IncorrectPassword,

    /// Gated request without a live session; carries the client message.
    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hashing(#[from] HashingError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether this is an infrastructure failure rather than a caller mistake.
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::Hashing(HashingError::TooLong) => false,
            Self::Store(_) | Self::Hashing(_) | Self::Internal(_) => true,
            _ => false,
        }
    }

    /// Text safe to return to the client.
    ///
    /// Server-side failures get a generic message; the detail goes to the log.
    pub fn public_message(&self, distinct_login_errors: bool) -> String {
        match self {
            Self::NotFound | Self::IncorrectPassword if !distinct_login_errors => {
                INVALID_CREDENTIALS.to_owned()
            }
            Self::Store(_) => "storage failure".to_owned(),
            Self::Hashing(HashingError::TooLong) => "password exceeds 72 bytes".to_owned(),
            Self::Hashing(_) => "password hashing failure".to_owned(),
            Self::Internal(_) => "internal error".to_owned(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_failures_share_a_message_by_default() {
        assert_eq!(AuthError::NotFound.public_message(false), INVALID_CREDENTIALS);
        assert_eq!(
            AuthError::IncorrectPassword.public_message(false),
            INVALID_CREDENTIALS
        );
    }

    #[test]
    fn login_failures_can_be_told_apart_when_enabled() {
        assert_eq!(AuthError::NotFound.public_message(true), "user not found");
        assert_eq!(
            AuthError::IncorrectPassword.public_message(true),
            "incorrect password"
        );
    }

    #[test]
    fn server_errors_do_not_leak_detail() {
        let err = AuthError::Internal("worker thread panicked at src/x.rs".into());
        assert!(err.is_server_error());
        assert_eq!(err.public_message(false), "internal error");

        let err = AuthError::Hashing(HashingError::Malformed("bad salt".into()));
        assert_eq!(err.public_message(false), "password hashing failure");
    }

    #[test]
    fn overlong_password_is_a_client_error() {
        let err = AuthError::Hashing(HashingError::TooLong);
        assert!(!err.is_server_error());
        assert_eq!(err.public_message(false), "password exceeds 72 bytes");
        assert!(AuthError::Hashing(HashingError::InvalidCost(3)).is_server_error());
    }

    #[test]
    fn client_errors_are_not_server_errors() {
        assert!(!AuthError::Conflict.is_server_error());
        assert!(!AuthError::Validation("username required".into()).is_server_error());
        assert!(!AuthError::Unauthenticated("login required").is_server_error());
    }
}
