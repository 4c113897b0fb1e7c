//! A `rusqlite`-backed [`AccountStore`].
//!
//! `rusqlite::Connection` is synchronous; queries here run inline under
//! a `tokio::sync::Mutex` rather than via `spawn_blocking`; the account
//! table sees low enough request volume (login and admin operations,
//! never the hot game-traffic path) that this is simpler and fine.

use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::AccountError;
use crate::flags::AccountFlags;
use crate::hash::{acct_hash, login_hash, HashAlgorithm};
use crate::store::{AccountStore, AuthResult};

/// An account table backed by a SQLite database file (or `:memory:` for
/// tests).
pub struct SqliteAccountStore {
    conn: Mutex<Connection>,
}

impl SqliteAccountStore {
    /// Opens (creating if needed) the account table at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Backend`] if the database cannot be
    /// opened or the schema cannot be created.
    pub fn open(path: &str) -> Result<Self, AccountError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory database, useful for tests.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Backend`] if the schema cannot be
    /// created.
    pub fn open_in_memory() -> Result<Self, AccountError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), AccountError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                name  TEXT PRIMARY KEY,
                uuid  TEXT NOT NULL UNIQUE,
                hash  BLOB NOT NULL,
                flags INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl AccountStore for SqliteAccountStore {
    async fn create(
        &self,
        name: &str,
        password: &str,
        flags: AccountFlags,
    ) -> Result<Uuid, AccountError> {
        let hash = acct_hash(name, password, HashAlgorithm::Sha1);
        let stored_flags = (flags | AccountFlags::HASH_SHA1).bits();
        let uuid = Uuid::new_v4();

        let conn = self.conn.lock().await;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO accounts (name, uuid, hash, flags) VALUES (?1, ?2, ?3, ?4)",
            params![
                name.to_lowercase(),
                uuid.to_string(),
                hash.as_slice(),
                stored_flags
            ],
        )?;
        if inserted == 0 {
            return Err(AccountError::AlreadyExists);
        }
        debug!(%name, %uuid, "account created");
        Ok(uuid)
    }

    async fn authenticate(
        &self,
        name: &str,
        cli_challenge: u32,
        srv_challenge: u32,
        client_hash: &[u8],
    ) -> Result<AuthResult, AccountError> {
        let conn = self.conn.lock().await;
        let row: Option<(String, Vec<u8>, u32)> = conn
            .query_row(
                "SELECT uuid, hash, flags FROM accounts WHERE name = ?1",
                params![name.to_lowercase()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .ok();
        drop(conn);

        let (uuid_str, stored_hash, flags_bits) = row.ok_or(AccountError::NotFound)?;
        let flags = AccountFlags::from_bits_truncate(flags_bits);
        if flags.contains(AccountFlags::BANNED) {
            return Err(AccountError::Banned);
        }

        let expected = login_hash(&stored_hash, cli_challenge, srv_challenge);
        if expected != client_hash {
            return Err(AccountError::AuthenticationFailed);
        }

        let uuid = Uuid::parse_str(&uuid_str).map_err(|_| AccountError::NotFound)?;
        Ok(AuthResult { uuid, flags })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scenario_4_create_then_authenticate_round_trips() {
        let store = SqliteAccountStore::open_in_memory().unwrap();
        let uuid = store
            .create("alice", "pw", AccountFlags::USER)
            .await
            .unwrap();

        let stored_hash = acct_hash("alice", "pw", HashAlgorithm::Sha1);
        let client_hash = login_hash(&stored_hash, 0xAAAA, 0xBBBB);
        let result = store
            .authenticate("alice", 0xAAAA, 0xBBBB, &client_hash)
            .await
            .unwrap();
        assert_eq!(result.uuid, uuid);
        assert!(result.flags.contains(AccountFlags::USER));
    }

    #[tokio::test]
    async fn scenario_4_wrong_password_fails_authentication() {
        let store = SqliteAccountStore::open_in_memory().unwrap();
        store
            .create("alice", "pw", AccountFlags::USER)
            .await
            .unwrap();

        let wrong_hash = acct_hash("alice", "not-pw", HashAlgorithm::Sha1);
        let client_hash = login_hash(&wrong_hash, 0xAAAA, 0xBBBB);
        let err = store
            .authenticate("alice", 0xAAAA, 0xBBBB, &client_hash)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn create_rejects_a_duplicate_name() {
        let store = SqliteAccountStore::open_in_memory().unwrap();
        store
            .create("alice", "pw", AccountFlags::USER)
            .await
            .unwrap();
        let err = store
            .create("alice", "different", AccountFlags::USER)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::AlreadyExists));
    }

    #[tokio::test]
    async fn authenticate_rejects_a_banned_account() {
        let store = SqliteAccountStore::open_in_memory().unwrap();
        store
            .create("alice", "pw", AccountFlags::USER | AccountFlags::BANNED)
            .await
            .unwrap();
        let stored_hash = acct_hash("alice", "pw", HashAlgorithm::Sha1);
        let client_hash = login_hash(&stored_hash, 1, 2);
        let err = store
            .authenticate("alice", 1, 2, &client_hash)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Banned));
    }
}
