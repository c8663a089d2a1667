//! bcrypt password hashing with a configurable work factor.

use thiserror::Error;

/// Smallest cost bcrypt accepts.
pub const MIN_COST: u32 = 4;

/// Largest cost bcrypt accepts.
pub const MAX_COST: u32 = 31;

/// bcrypt only looks at the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Error)]
pub enum HashingError {
    #[error("password exceeds 72 bytes")]
    TooLong,

    #[error("bcrypt cost {0} is outside 4..=31")]
    InvalidCost(u32),

    #[error("stored password hash is malformed: {0}")]
    Malformed(String),

    #[error("password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

/// Turns plaintext passwords into salted bcrypt hashes and checks them back.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, HashingError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(HashingError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    /// Hash `plaintext` with a fresh random salt.
    ///
    /// Inputs longer than [`MAX_PASSWORD_BYTES`] are rejected instead of
    /// being silently truncated.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashingError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(HashingError::TooLong);
        }
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    /// Check `plaintext` against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; only an unparseable stored hash is an error.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool, HashingError> {
        // Could never have been produced by `hash`.
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        bcrypt::verify(plaintext, stored_hash).map_err(|e| HashingError::Malformed(e.to_string()))
    }
}
