//! The client-side transaction router and reconnect timer.
//!
//! # Overview
//!
//! [`transaction::TransactionRouter`] assigns non-zero, monotonically
//! increasing ids to outgoing requests and dispatches replies back to
//! the continuation that issued them, in the order replies are observed
//! on the wire rather than the order requests were issued.
//! [`reconnect::ReconnectTimer`] kills all outstanding transactions with
//! `disconnected` and retries the connect sequence on a back-off when a
//! connection drops.

pub mod error;
pub mod reconnect;
pub mod transaction;

pub use error::RouterError;
pub use reconnect::{ReconnectTimer, DEFAULT_BACKOFF};
pub use transaction::{Continuation, TransactionRouter};
