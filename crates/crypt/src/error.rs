//! Failure modes for key generation, parsing, and handshakes.

use thiserror::Error;

/// Errors raised by [`crate::keys`] and [`crate::handshake`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptError {
    /// The handshake peer closed the connection before sending a
    /// complete message.
    #[error("connection closed mid-handshake")]
    Truncated,
    /// A handshake message's type byte did not match what was expected
    /// at this point in the exchange.
    #[error("unexpected handshake message type: expected {expected}, got {got}")]
    TypeMismatch {
        /// The message type the state machine was waiting for.
        expected: u8,
        /// The message type actually received.
        got: u8,
    },
    /// A length field in a handshake message claimed more bytes than
    /// the protocol allows.
    #[error("handshake length {0} exceeds the maximum allowed")]
    LengthOverflow(u8),
    /// A base-64 key-material string failed to decode.
    #[error("invalid base64 key material: {0}")]
    InvalidBase64(String),
    /// Key material decoded from base-64 but was not usable (e.g. an
    /// empty big integer).
    #[error("invalid key material")]
    InvalidKeyMaterial,
}
