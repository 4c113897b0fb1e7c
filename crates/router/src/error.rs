//! Router-local failure modes.

use thiserror::Error;

/// Failures raised by [`crate::transaction::TransactionRouter`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// `fire_trans` was called with an id that has no pending record
    /// (already fired, killed, or never issued). Logged as a
    /// diagnostic, not treated as fatal.
    #[error("no pending transaction for id {0}")]
    UnknownTransaction(u32),
}
