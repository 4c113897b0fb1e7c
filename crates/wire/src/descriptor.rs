//! Declarative net-struct descriptors: ordered field lists that describe a
//! message body's on-wire layout.
//!
//! A [`Descriptor`] is a process-lifetime constant — in practice a
//! `static` slice of [`Field`] built with the [`desc!`] helper macro —
//! shared by the streaming reader ([`crate::reader`]) and the encoder
//! ([`crate::value`]).

/// The byte width of a variable-length field's length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthWidth {
    /// A single-byte length prefix ("tiny"), max 255 bytes of payload.
    Tiny,
    /// A two-byte little-endian length prefix, max 65535 bytes of payload.
    Medium,
    /// A four-byte little-endian length prefix ("huge").
    Huge,
}

impl LengthWidth {
    /// Number of bytes the length prefix itself occupies.
    #[must_use]
    pub fn prefix_bytes(self) -> usize {
        match self {
            Self::Tiny => 1,
            Self::Medium => 2,
            Self::Huge => 4,
        }
    }

    /// Reads the length prefix from the front of `buf`.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is shorter than [`Self::prefix_bytes`]; callers in
    /// this crate only invoke this once that many bytes have accumulated.
    #[must_use]
    pub fn read(self, buf: &[u8]) -> u32 {
        match self {
            Self::Tiny => u32::from(buf[0]),
            Self::Medium => u32::from(crate::codec::read_u16(buf)),
            Self::Huge => crate::codec::read_u32(buf),
        }
    }

    /// Appends `value` to `out` using this width's encoding.
    ///
    /// # Panics
    ///
    /// Panics (via a `debug_assert!`) if `value` overflows the width's
    /// range; callers size their buffers before encoding.
    pub fn write(self, out: &mut Vec<u8>, value: u32) {
        match self {
            Self::Tiny => {
                debug_assert!(value <= u32::from(u8::MAX));
                out.push(value as u8);
            }
            Self::Medium => {
                debug_assert!(value <= u32::from(u16::MAX));
                crate::codec::write_u16(out, value as u16);
            }
            Self::Huge => crate::codec::write_u32(out, value),
        }
    }
}

/// One field of a message body, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// A fixed-width little-endian integer: 1, 2, 4, or 8 bytes.
    Integer(u8),
    /// A 16-byte mixed-endian UUID.
    Uuid,
    /// Exactly `N` raw bytes.
    Blob(usize),
    /// A length-prefixed buffer; the length is not repeated in the payload.
    Buffer(LengthWidth),
    /// A length-prefixed buffer whose length is repeated as the first
    /// bytes of the payload (same width as the outer prefix); both
    /// copies must agree or the message is rejected.
    BufferRedundant(LengthWidth),
    /// A UTF-16LE string: a 2-byte code-unit count followed by that many
    /// 16-bit code units (no trailing NUL).
    String,
    /// A 4-byte transaction id.
    Transaction,
}

impl Field {
    /// The fixed wire size of this field, if it does not depend on
    /// runtime content (i.e. everything except [`Field::Buffer`],
    /// [`Field::BufferRedundant`], and [`Field::String`]).
    #[must_use]
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Integer(width) => Some(width as usize),
            Self::Uuid => Some(16),
            Self::Blob(n) => Some(n),
            Self::Transaction => Some(4),
            Self::Buffer(_) | Self::BufferRedundant(_) | Self::String => None,
        }
    }
}

/// An ordered, process-lifetime list of [`Field`]s describing a message
/// body.
pub type Descriptor = &'static [Field];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_width_round_trips_each_size() {
        for (width, value) in [
            (LengthWidth::Tiny, 200u32),
            (LengthWidth::Medium, 60_000),
            (LengthWidth::Huge, 3_000_000_000),
        ] {
            let mut buf = Vec::new();
            width.write(&mut buf, value);
            assert_eq!(buf.len(), width.prefix_bytes());
            assert_eq!(width.read(&buf), value);
        }
    }

    #[test]
    fn fixed_size_matches_field_kind() {
        assert_eq!(Field::Integer(4).fixed_size(), Some(4));
        assert_eq!(Field::Uuid.fixed_size(), Some(16));
        assert_eq!(Field::Blob(5).fixed_size(), Some(5));
        assert_eq!(Field::Transaction.fixed_size(), Some(4));
        assert_eq!(Field::Buffer(LengthWidth::Tiny).fixed_size(), None);
        assert_eq!(Field::String.fixed_size(), None);
    }
}
