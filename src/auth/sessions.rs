//! In-memory session registry.
//!
//! Maps opaque session tokens to usernames. Nothing is persisted and there
//! is no expiry sweep: an entry lives until logout or process restart. The
//! cookie that carries the token has its own max-age on the client side.

use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::fmt;

/// Token byte length before hex encoding (16 bytes = 32 hex chars).
pub const TOKEN_BYTES: usize = 16;

/// Shared token -> username mapping consulted on every gated request.
///
/// Implementations must be safe to call from many in-flight requests at
/// once; no insert or delete may be lost.
pub trait SessionStore: Send + Sync {
    /// Issue a fresh token for `username` and record it.
    fn create(&self, username: &str) -> String;

    /// Resolve a token. Unknown and empty tokens are `None`.
    fn lookup(&self, token: &str) -> Option<String>;

    /// Forget a token. Returns whether it was present.
    fn delete(&self, token: &str) -> bool;

    /// Number of live sessions.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `RwLock`-guarded registry: one writer at a time, concurrent readers.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for SessionRegistry {
    fn create(&self, username: &str) -> String {
        let mut sessions = self.sessions.write();
        let mut token = generate_token();
        while sessions.contains_key(&token) {
            token = generate_token();
        }
        sessions.insert(token.clone(), username.to_owned());
        token
    }

    fn lookup(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }
        self.sessions.read().get(token).cloned()
    }

    fn delete(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

// Tokens are credentials; only the count is printable.
impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}

/// Generate a random session token (hex-encoded).
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
