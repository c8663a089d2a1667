//! Registration, login and logout on top of the credential store, the
//! password hasher and the session registry.
//!
//! Every method here is synchronous and may block on SQLite or bcrypt;
//! async callers should run them on the blocking pool.

use super::error::AuthError;
use super::password::PasswordHasher;
use super::sessions::SessionStore;
use super::store::{CredentialStore, InsertOutcome};
use std::sync::Arc;

/// Plaintext hashed once at startup so logins for unknown users still pay
/// for one bcrypt verification.
const TIMING_DUMMY_PASSWORD: &str = "authgate-timing-dummy";

/// Registration form as submitted.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub allow_registration: bool,
    /// Tell "user not found" and "incorrect password" apart in responses.
    pub distinct_login_errors: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            allow_registration: true,
            distinct_login_errors: false,
        }
    }
}

pub struct AuthService {
    store: Arc<CredentialStore>,
    hasher: PasswordHasher,
    sessions: Arc<dyn SessionStore>,
    settings: AuthSettings,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<CredentialStore>,
        hasher: PasswordHasher,
        sessions: Arc<dyn SessionStore>,
        settings: AuthSettings,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash(TIMING_DUMMY_PASSWORD)?;
        Ok(Self {
            store,
            hasher,
            sessions,
            settings,
            dummy_hash,
        })
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Create a user. Returns the new user id.
    ///
    /// `current_token` is the caller's session cookie, if any: a caller that
    /// is already logged in may not register another account.
    pub fn register(
        &self,
        registration: &Registration,
        current_token: Option<&str>,
    ) -> Result<i64, AuthError> {
        if self.whoami(current_token).is_some() {
            return Err(AuthError::AlreadyAuthenticated);
        }
        if !self.settings.allow_registration {
            return Err(AuthError::RegistrationDisabled);
        }

        let username = registration.username.trim();
        let email = registration.email.trim();
        if username.is_empty() || registration.password.is_empty() || email.is_empty() {
            return Err(AuthError::Validation(
                "username, password and email are required".into(),
            ));
        }

        if self.store.registration_conflict(username, email)? {
            return Err(AuthError::Conflict);
        }

        let password_hash = self.hasher.hash(&registration.password)?;
        self.insert_registered(username, &password_hash, email)
    }

    /// The pre-check in `register` races with concurrent registrations; the
    /// UNIQUE constraints settle it here.
    fn insert_registered(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
    ) -> Result<i64, AuthError> {
        match self.store.insert_user(username, password_hash, email)? {
            InsertOutcome::Created(id) => {
                tracing::info!(username, user_id = id, "User registered");
                Ok(id)
            }
            InsertOutcome::Duplicate => {
                tracing::debug!(username, "Registration lost a uniqueness race");
                Err(AuthError::Conflict)
            }
        }
    }

    /// Check credentials and open a session. Returns the session token.
    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "username and password are required".into(),
            ));
        }

        let Some(creds) = self.store.credentials(username)? else {
            let _ = self.hasher.verify(password, &self.dummy_hash);
            tracing::warn!(username, "Login rejected: unknown user");
            return Err(AuthError::NotFound);
        };

        if !self.hasher.verify(password, &creds.password_hash)? {
            tracing::warn!(username = creds.username.as_str(), "Login rejected: wrong password");
            return Err(AuthError::IncorrectPassword);
        }

        let token = self.sessions.create(&creds.username);
        tracing::info!(
            username = creds.username.as_str(),
            active_sessions = self.sessions.len(),
            "User logged in"
        );
        Ok(token)
    }

    /// Drop the session behind `token`, known or not.
    ///
    /// Returns `true` when a non-empty token was presented, i.e. when the
    /// caller should clear the cookie.
    pub fn logout(&self, token: Option<&str>) -> bool {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return false;
        };
        if self.sessions.delete(token) {
            tracing::info!(active_sessions = self.sessions.len(), "User logged out");
        } else {
            tracing::debug!("Logout with unknown session token");
        }
        true
    }

    /// Username behind a session token.
    pub fn whoami(&self, token: Option<&str>) -> Option<String> {
        token.and_then(|t| self.sessions.lookup(t))
    }

    /// Whether `username` is still free.
    pub fn username_available(&self, username: &str) -> Result<bool, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::Validation("username is required".into()));
        }
        Ok(!self.store.username_taken(username)?)
    }

    /// Hash an arbitrary password with the configured cost.
    pub fn hash_password(&self, plaintext: &str) -> Result<String, AuthError> {
        if plaintext.is_empty() {
            return Err(AuthError::Validation("password is required".into()));
        }
        Ok(self.hasher.hash(plaintext)?)
    }
}
