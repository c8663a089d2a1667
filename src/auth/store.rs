//! SQLite-backed credential store.
//!
//! Tables:
//! - `users`: id, username, password_hash, email, created_at
//!
//! Username and email are `UNIQUE COLLATE NOCASE`; the constraint is the
//! authoritative duplicate guard; pre-queries only answer early.

use parking_lot::Mutex;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// How long a statement waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// What login needs from the store.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password_hash: String,
}

/// Result of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(i64),
    /// The username or email collided with an existing row.
    Duplicate,
}

/// SQLite-backed user table.
pub struct CredentialStore {
    conn: Mutex<rusqlite::Connection>,
}

impl CredentialStore {
    /// Open (or create) the credential database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = rusqlite::Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        Self::from_connection(conn)
    }

    /// Private in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(rusqlite::Connection::open_in_memory()?)
    }

    fn from_connection(conn: rusqlite::Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                created_at INTEGER NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Whether a user with this username exists.
    pub fn username_taken(&self, username: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            rusqlite::params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether the username or the email is already registered.
    pub fn registration_conflict(&self, username: &str, email: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
            rusqlite::params![username, email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a user. A UNIQUE violation is reported as
    /// [`InsertOutcome::Duplicate`], not as an error.
    pub fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
    ) -> Result<InsertOutcome, StoreError> {
        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, email, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![username, password_hash, email, epoch_secs()],
        );

        match result {
            Ok(_) => Ok(InsertOutcome::Created(conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stored username (as registered) and password hash, if the user exists.
    pub fn credentials(&self, username: &str) -> Result<Option<Credentials>, StoreError> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            "SELECT username, password_hash FROM users WHERE username = ?1",
            rusqlite::params![username],
            |row| {
                Ok(Credentials {
                    username: row.get(0)?,
                    password_hash: row.get(1)?,
                })
            },
        );

        match row {
            Ok(creds) => Ok(Some(creds)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(test)]
    pub(crate) fn lock_connection(&self) -> parking_lot::MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock()
    }

    /// Count registered users.
    pub fn user_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> CredentialStore {
        CredentialStore::in_memory().unwrap()
    }

    #[test]
    fn insert_and_fetch_user() {
        let store = test_store();

        let outcome = store.insert_user("alice", "$2b$04$hash", "a@x.com").unwrap();
        let InsertOutcome::Created(id) = outcome else {
            panic!("expected Created, got {outcome:?}");
        };

        assert!(id > 0);
        let creds = store.credentials("alice").unwrap().unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password_hash, "$2b$04$hash");
    }

    #[test]
    fn unknown_user_has_no_hash() {
        let store = test_store();
        assert!(store.credentials("ghost").unwrap().is_none());
        assert!(!store.username_taken("ghost").unwrap());
    }

    #[test]
    fn duplicate_username_is_reported_not_raised() {
        let store = test_store();
        store.insert_user("alice", "h1", "a@x.com").unwrap();

        let outcome = store.insert_user("alice", "h2", "other@x.com").unwrap();
        assert_eq!(outcome, InsertOutcome::Duplicate);
        assert_eq!(store.credentials("alice").unwrap().unwrap().password_hash, "h1");
    }

    #[test]
    fn duplicate_email_is_reported() {
        let store = test_store();
        store.insert_user("alice", "h1", "a@x.com").unwrap();

        let outcome = store.insert_user("bob", "h2", "a@x.com").unwrap();
        assert_eq!(outcome, InsertOutcome::Duplicate);
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn uniqueness_ignores_case() {
        let store = test_store();
        store.insert_user("Alice", "h1", "A@X.com").unwrap();

        assert!(store.username_taken("alice").unwrap());
        assert_eq!(store.credentials("ALICE").unwrap().unwrap().username, "Alice");
        assert_eq!(
            store.insert_user("ALICE", "h2", "b@x.com").unwrap(),
            InsertOutcome::Duplicate
        );
        assert_eq!(
            store.insert_user("bob", "h2", "a@x.COM").unwrap(),
            InsertOutcome::Duplicate
        );
    }

    #[test]
    fn registration_conflict_checks_both_columns() {
        let store = test_store();
        store.insert_user("alice", "h1", "a@x.com").unwrap();

        assert!(store.registration_conflict("alice", "new@x.com").unwrap());
        assert!(store.registration_conflict("bob", "a@x.com").unwrap());
        assert!(!store.registration_conflict("bob", "b@x.com").unwrap());
    }

    #[test]
    fn user_count_tracks_inserts() {
        let store = test_store();
        assert_eq!(store.user_count().unwrap(), 0);
        store.insert_user("user_a", "h", "a@x.com").unwrap();
        assert_eq!(store.user_count().unwrap(), 1);
        store.insert_user("user_b", "h", "b@x.com").unwrap();
        assert_eq!(store.user_count().unwrap(), 2);
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nested").join("users.db");

        {
            let store = CredentialStore::open(&db_path).unwrap();
            store.insert_user("alice", "h1", "a@x.com").unwrap();
        }

        let store = CredentialStore::open(&db_path).unwrap();
        assert!(store.username_taken("alice").unwrap());
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn username_with_sql_metacharacters_is_stored_verbatim() {
        let store = test_store();
        let nasty = "robert'); DROP TABLE users;--";
        store.insert_user(nasty, "h", "r@x.com").unwrap();

        assert!(store.username_taken(nasty).unwrap());
        assert_eq!(store.user_count().unwrap(), 1);
    }
}
