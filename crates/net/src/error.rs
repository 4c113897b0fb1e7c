//! Connection-local failure modes. Per the propagation policy, every one
//! of these closes the offending connection; none are forwarded to a
//! peer as a reply payload.

use thiserror::Error;

/// Failures that can occur while accepting, framing, or routing a
/// connection.
#[derive(Debug, Error)]
pub enum ConnError {
    /// The underlying socket returned an I/O error.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A handshake failed (bad type byte, truncated message, length
    /// overflow).
    #[error("handshake failed: {0}")]
    Handshake(#[from] crypt::CryptError),
    /// A message body failed to encode or decode against its
    /// descriptor.
    #[error("wire framing error: {0}")]
    Wire(#[from] wire::WireError),
    /// The `connType` byte named a value this build does not know
    /// about.
    #[error("unrecognized connection type: {0}")]
    UnknownConnType(u8),
    /// `hdrBytes` was smaller than the 2-byte ConnHeader itself.
    #[error("connect header length {0} is smaller than the header itself")]
    HeaderTooShort(u8),
    /// The connect-data blob's `buildId`/`branchId`/`productId` failed
    /// the configured verification policy.
    #[error("connect data failed verification policy")]
    VerificationFailed,
    /// The dispatcher has no registered handler for this connection's
    /// role in this process.
    #[error("no handler registered for connection type {0:?}")]
    NoHandler(crate::conn_header::ConnType),
}
