//! The pluggable account storage backend.

use uuid::Uuid;

use crate::error::AccountError;
use crate::flags::AccountFlags;

/// Outcome of a successful [`AccountStore::authenticate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthResult {
    pub uuid: Uuid,
    pub flags: AccountFlags,
}

/// The account table the db daemon owns: `(name unique, uuid, hash
/// blob, flags u32)`. The core protocol logic imposes no schema
/// migration story; that is this trait's implementation's concern.
#[allow(async_fn_in_trait)]
pub trait AccountStore {
    /// Creates a new account, returning its assigned uuid.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::AlreadyExists`] if `name` is taken.
    async fn create(
        &self,
        name: &str,
        password: &str,
        flags: AccountFlags,
    ) -> Result<Uuid, AccountError>;

    /// Authenticates a login attempt using the SHA-1 challenge hash
    /// (see [`crate::hash::login_hash`]).
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] if no such account exists,
    /// [`AccountError::Banned`] if its `BANNED` flag is set, or
    /// [`AccountError::AuthenticationFailed`] if `client_hash` does not
    /// match.
    async fn authenticate(
        &self,
        name: &str,
        cli_challenge: u32,
        srv_challenge: u32,
        client_hash: &[u8],
    ) -> Result<AuthResult, AccountError>;
}
