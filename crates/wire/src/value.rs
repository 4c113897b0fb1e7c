//! Decoded field values and whole-message encode/decode helpers built on
//! top of [`crate::descriptor`].

use crate::codec::{read_u16, read_u32, read_u64, write_u16, write_u32, write_u64, WireUuid};
use crate::descriptor::{Descriptor, Field, LengthWidth};
use crate::error::WireError;

/// One decoded field value. The variant always matches the [`Field`] kind
/// it was read against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// An [`Field::Integer`] value, widened to `u64`.
    Int(u64),
    /// A [`Field::Uuid`] value.
    Uuid(WireUuid),
    /// A [`Field::Blob`] value.
    Blob(Vec<u8>),
    /// A [`Field::Buffer`] or [`Field::BufferRedundant`] value (the
    /// payload only; the length prefix is not retained).
    Buffer(Vec<u8>),
    /// A [`Field::String`] value, already decoded from UTF-16LE.
    Str(String),
    /// A [`Field::Transaction`] value.
    Transaction(u32),
}

impl FieldValue {
    /// Returns the transaction id if this value is a
    /// [`FieldValue::Transaction`].
    #[must_use]
    pub fn as_transaction(&self) -> Option<u32> {
        match self {
            Self::Transaction(id) => Some(*id),
            _ => None,
        }
    }
}

/// Encodes `values` against `descriptor`, appending the wire bytes to
/// `out`. `values` must have exactly one entry per field in `descriptor`,
/// in order.
///
/// # Errors
///
/// Returns [`WireError::ValueMismatch`] if a value's shape does not match
/// its field (e.g. a `Blob` value whose length differs from the
/// descriptor's fixed size).
pub fn encode_message(
    descriptor: Descriptor,
    values: &[FieldValue],
    out: &mut Vec<u8>,
) -> Result<(), WireError> {
    if values.len() != descriptor.len() {
        return Err(WireError::ValueMismatch);
    }
    for (field, value) in descriptor.iter().zip(values) {
        encode_field(*field, value, out)?;
    }
    Ok(())
}

fn encode_field(field: Field, value: &FieldValue, out: &mut Vec<u8>) -> Result<(), WireError> {
    match (field, value) {
        (Field::Integer(1), FieldValue::Int(v)) => {
            out.push(u8::try_from(*v).map_err(|_| WireError::ValueMismatch)?);
        }
        (Field::Integer(2), FieldValue::Int(v)) => {
            write_u16(out, u16::try_from(*v).map_err(|_| WireError::ValueMismatch)?);
        }
        (Field::Integer(4), FieldValue::Int(v)) => {
            write_u32(out, u32::try_from(*v).map_err(|_| WireError::ValueMismatch)?);
        }
        (Field::Integer(8), FieldValue::Int(v)) => write_u64(out, *v),
        (Field::Integer(_), _) => return Err(WireError::ValueMismatch),
        (Field::Uuid, FieldValue::Uuid(u)) => out.extend_from_slice(u),
        (Field::Blob(n), FieldValue::Blob(bytes)) => {
            if bytes.len() != n {
                return Err(WireError::ValueMismatch);
            }
            out.extend_from_slice(bytes);
        }
        (Field::Buffer(width), FieldValue::Buffer(bytes)) => {
            let len = u32::try_from(bytes.len()).map_err(|_| WireError::ValueMismatch)?;
            width.write(out, len);
            out.extend_from_slice(bytes);
        }
        (Field::BufferRedundant(width), FieldValue::Buffer(bytes)) => {
            let len = u32::try_from(bytes.len()).map_err(|_| WireError::ValueMismatch)?;
            width.write(out, len);
            width.write(out, len);
            out.extend_from_slice(bytes);
        }
        (Field::String, FieldValue::Str(s)) => {
            let units: Vec<u16> = s.encode_utf16().collect();
            let len = u16::try_from(units.len()).map_err(|_| WireError::ValueMismatch)?;
            write_u16(out, len);
            for unit in units {
                write_u16(out, unit);
            }
        }
        (Field::Transaction, FieldValue::Transaction(id)) => write_u32(out, *id),
        _ => return Err(WireError::ValueMismatch),
    }
    Ok(())
}

/// Decodes a complete, already-buffered message body against
/// `descriptor`. This is the non-streaming counterpart of
/// [`crate::reader::MessageReader`], useful for tests and for small
/// fixed-size handshake messages that never arrive split across reads.
///
/// # Errors
///
/// Returns [`WireError::RedundantLengthMismatch`] if a
/// `BufferRedundant` field's two length copies disagree, or
/// [`WireError::InvalidUtf16`] if a string's code units are not valid
/// UTF-16. Panics (via slice indexing) if `buf` is shorter than the
/// descriptor demands; callers that might receive truncated input
/// should go through [`crate::reader::MessageReader`] instead.
pub fn decode_message(descriptor: Descriptor, buf: &[u8]) -> Result<Vec<FieldValue>, WireError> {
    let mut pos = 0usize;
    let mut values = Vec::with_capacity(descriptor.len());
    for field in descriptor {
        let (value, consumed) = decode_field(*field, &buf[pos..])?;
        values.push(value);
        pos += consumed;
    }
    Ok(values)
}

fn decode_field(field: Field, buf: &[u8]) -> Result<(FieldValue, usize), WireError> {
    match field {
        Field::Integer(1) => Ok((FieldValue::Int(u64::from(buf[0])), 1)),
        Field::Integer(2) => Ok((FieldValue::Int(u64::from(read_u16(buf))), 2)),
        Field::Integer(4) => Ok((FieldValue::Int(u64::from(read_u32(buf))), 4)),
        Field::Integer(8) => Ok((FieldValue::Int(read_u64(buf)), 8)),
        Field::Integer(_) => Err(WireError::ValueMismatch),
        Field::Uuid => {
            let mut u = [0u8; 16];
            u.copy_from_slice(&buf[0..16]);
            Ok((FieldValue::Uuid(u), 16))
        }
        Field::Blob(n) => Ok((FieldValue::Blob(buf[0..n].to_vec()), n)),
        Field::Buffer(width) => {
            let prefix = width.prefix_bytes();
            let len = width.read(&buf[0..prefix]) as usize;
            let payload = buf[prefix..prefix + len].to_vec();
            Ok((FieldValue::Buffer(payload), prefix + len))
        }
        Field::BufferRedundant(width) => {
            let prefix = width.prefix_bytes();
            let outer = width.read(&buf[0..prefix]);
            let inner = width.read(&buf[prefix..prefix + prefix]);
            if outer != inner {
                return Err(WireError::RedundantLengthMismatch { outer, inner });
            }
            let len = outer as usize;
            let payload_start = prefix + prefix;
            let payload = buf[payload_start..payload_start + len].to_vec();
            Ok((FieldValue::Buffer(payload), payload_start + len))
        }
        Field::String => {
            let unit_count = read_u16(&buf[0..2]) as usize;
            let mut units = Vec::with_capacity(unit_count);
            let mut pos = 2;
            for _ in 0..unit_count {
                units.push(read_u16(&buf[pos..pos + 2]));
                pos += 2;
            }
            let s = String::from_utf16(&units).map_err(|_| WireError::InvalidUtf16)?;
            Ok((FieldValue::Str(s), pos))
        }
        Field::Transaction => Ok((FieldValue::Transaction(read_u32(buf)), 4)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::LengthWidth;

    const SAMPLE: Descriptor = &[Field::Integer(2), Field::Transaction, Field::String];

    #[test]
    fn scenario_3_framing_example_from_spec() {
        // Descriptor [u16 type, u32 transId, string] with
        // (0x0002, 0x01020304, "Ab") encodes to the 12-byte example in §8.
        let values = vec![
            FieldValue::Int(0x0002),
            FieldValue::Transaction(0x0102_0304),
            FieldValue::Str("Ab".to_string()),
        ];
        let mut encoded = Vec::new();
        encode_message(SAMPLE, &values, &mut encoded).unwrap();
        assert_eq!(
            encoded,
            vec![
                0x02, 0x00, // type
                0x04, 0x03, 0x02, 0x01, // transId
                0x02, 0x00, // string length = 2 code units
                0x41, 0x00, // 'A'
                0x42, 0x00, // 'b'
            ]
        );
        let decoded = decode_message(SAMPLE, &encoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn redundant_buffer_requires_matching_lengths() {
        const DESC: Descriptor = &[Field::BufferRedundant(LengthWidth::Tiny)];
        let values = vec![FieldValue::Buffer(vec![1, 2, 3])];
        let mut encoded = Vec::new();
        encode_message(DESC, &values, &mut encoded).unwrap();
        assert_eq!(encoded, vec![3, 3, 1, 2, 3]);

        let mut corrupted = encoded.clone();
        corrupted[1] = 4;
        let err = decode_message(DESC, &corrupted).unwrap_err();
        assert_eq!(
            err,
            WireError::RedundantLengthMismatch { outer: 3, inner: 4 }
        );
    }

    #[test]
    fn uuid_is_opaque_16_bytes() {
        const DESC: Descriptor = &[Field::Uuid];
        let uuid = [7u8; 16];
        let values = vec![FieldValue::Uuid(uuid)];
        let mut encoded = Vec::new();
        encode_message(DESC, &values, &mut encoded).unwrap();
        assert_eq!(encoded, uuid);
        assert_eq!(decode_message(DESC, &encoded).unwrap(), values);
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::reader::MessageReader;

    const DESC: Descriptor = &[
        Field::Transaction,
        Field::Integer(4),
        Field::String,
        Field::Blob(4),
        Field::Buffer(LengthWidth::Medium),
    ];

    fn arb_values() -> impl Strategy<Value = Vec<FieldValue>> {
        (
            any::<u32>(),
            any::<u32>(),
            ".{0,32}",
            any::<[u8; 4]>(),
            proptest::collection::vec(any::<u8>(), 0..64),
        )
            .prop_map(|(trans_id, int_val, s, blob, buffer)| {
                vec![
                    FieldValue::Transaction(trans_id),
                    FieldValue::Int(u64::from(int_val)),
                    FieldValue::Str(s),
                    FieldValue::Blob(blob.to_vec()),
                    FieldValue::Buffer(buffer),
                ]
            })
    }

    proptest! {
        #[test]
        fn encode_then_decode_recovers_the_original_values(values in arb_values()) {
            let mut encoded = Vec::new();
            encode_message(DESC, &values, &mut encoded).unwrap();
            let decoded = decode_message(DESC, &encoded).unwrap();
            prop_assert_eq!(decoded, values);
        }

        /// Splitting the same bytes arbitrarily across `feed` calls must
        /// never change what the streaming reader recovers -- a socket
        /// read can land anywhere mid-field.
        #[test]
        fn streaming_reader_is_indifferent_to_chunk_boundaries(
            values in arb_values(),
            split_at in 0usize..200,
        ) {
            let mut encoded = Vec::new();
            encode_message(DESC, &values, &mut encoded).unwrap();
            let split = split_at.min(encoded.len());
            let (first, second) = encoded.split_at(split);

            let mut reader = MessageReader::new(DESC);
            let mut slice = first;
            let mut result = reader.feed(&mut slice).unwrap();
            if result.is_none() {
                let mut rest = second;
                result = reader.feed(&mut rest).unwrap();
            }
            prop_assert_eq!(result, Some(values));
        }
    }
}
