//! Session-based user authentication.
//!
//! Provides:
//! - User registration with username/password/email (bcrypt, configurable cost)
//! - Opaque hex session tokens held in an in-memory registry
//! - SQLite-backed credential storage
//!
//! ## Design Decisions
//! - Sessions live only in process memory behind a `SessionStore` trait, so
//!   a restart logs everybody out. The registry is injected, never global.
//! - Duplicate usernames/emails are caught by UNIQUE constraints; the
//!   pre-query in `register` only gives the common case a cheap answer.

pub mod error;
pub mod password;
pub mod service;
pub mod sessions;
pub mod store;

pub use error::AuthError;
pub use password::{HashingError, PasswordHasher};
pub use service::{AuthService, AuthSettings, Registration};
pub use sessions::{SessionRegistry, SessionStore};
pub use store::{CredentialStore, StoreError};
