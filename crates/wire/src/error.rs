//! Errors raised while encoding or decoding a message body.

use thiserror::Error;

/// Failure modes for [`crate::value`] and [`crate::reader`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// A `BufferRedundant` field's outer and inner length prefixes
    /// disagreed.
    #[error("redundant length mismatch: outer={outer} inner={inner}")]
    RedundantLengthMismatch {
        /// The length prefix read outside the payload.
        outer: u32,
        /// The length prefix read as the first bytes of the payload.
        inner: u32,
    },
    /// A string's UTF-16 code units did not form valid UTF-16.
    #[error("invalid UTF-16LE string payload")]
    InvalidUtf16,
    /// A field's value does not match the [`crate::descriptor::Field`]
    /// it is being encoded against (e.g. a `Blob(8)` fed a 4-byte slice).
    #[error("value does not fit field descriptor")]
    ValueMismatch,
    /// The read buffer for a message could not be allocated.
    #[error("allocation failed while growing the read buffer")]
    AllocationFailed,
    /// A length prefix claimed more bytes than the configured maximum
    /// message size allows.
    #[error("field length {0} exceeds the maximum allowed message size")]
    LengthOverflow(u32),
}
