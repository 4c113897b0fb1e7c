//! Failure modes for account creation, lookup, and authentication.

use thiserror::Error;

/// Errors raised by [`crate::store::AccountStore`] implementations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// `create` was called with a name that already has an account.
    #[error("account already exists")]
    AlreadyExists,
    /// No account exists with the requested name.
    #[error("account not found")]
    NotFound,
    /// The supplied credentials did not match the stored hash.
    #[error("authentication failed")]
    AuthenticationFailed,
    /// The account's `banned` flag is set.
    #[error("account is banned")]
    Banned,
    /// The backing store failed.
    #[error("account store error: {0}")]
    Backend(#[from] rusqlite::Error),
}
