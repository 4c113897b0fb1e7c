//! The streaming message-body reader: a pure state machine over an
//! immutable [`Descriptor`] and a mutable cursor (§4.1 of the design).
//!
//! [`MessageReader::feed`] is safe to call with however many bytes a
//! socket read produced — one byte or one megabyte. It never blocks and
//! never allocates more than one message body's worth of memory at a
//! time. Driving code (see `net::connection`) is expected to fully
//! process a completed message (the "continuation") before asking the
//! reader to start accumulating the next one; that ordering is what the
//! original design's "read queued" flag achieves and what an `async`
//! read loop gets for free by simply not issuing the next `read().await`
//! until the per-message handler future resolves.

use tracing::warn;

use crate::descriptor::{Descriptor, Field, LengthWidth};
use crate::error::WireError;
use crate::value::FieldValue;

/// Ceiling on any single length-prefixed payload, guarding against a
/// malicious or corrupt peer claiming a multi-gigabyte buffer. Chosen
/// generously above any legitimate account/admin message.
pub const MAX_FIELD_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug)]
enum Stage {
    /// Accumulating a field whose size is known up front (integers,
    /// UUIDs, blobs, transaction ids).
    Fixed,
    /// Accumulating a `Buffer`'s length prefix.
    BufferLen(LengthWidth),
    /// Accumulating a `Buffer`'s payload, now that its length is known.
    BufferPayload,
    /// Accumulating a `BufferRedundant`'s outer length prefix.
    RedundantOuterLen(LengthWidth),
    /// Accumulating a `BufferRedundant`'s inner (repeated) length
    /// prefix, remembering the outer value read so far.
    RedundantInnerLen(LengthWidth, u32),
    /// Accumulating a `BufferRedundant`'s payload.
    RedundantPayload,
    /// Accumulating a `String`'s 2-byte UTF-16 code-unit count.
    StringLen,
    /// Accumulating a `String`'s UTF-16LE payload, in bytes (`2 *
    /// unit_count`).
    StringPayload,
}

/// Incrementally parses one message body at a time against a fixed
/// [`Descriptor`].
///
/// Construct one `MessageReader` per logical message slot on a
/// connection (most connections need exactly one, reused message after
/// message) and call [`Self::feed`] with each chunk of bytes read off
/// the socket.
pub struct MessageReader {
    descriptor: Descriptor,
    field_index: usize,
    stage: Stage,
    scratch: Vec<u8>,
    target: usize,
    values: Vec<FieldValue>,
}

impl MessageReader {
    /// Creates a reader for `descriptor`, ready to parse the first
    /// field.
    #[must_use]
    pub fn new(descriptor: Descriptor) -> Self {
        let mut reader = Self {
            descriptor,
            field_index: 0,
            stage: Stage::Fixed,
            scratch: Vec::new(),
            target: 0,
            values: Vec::with_capacity(descriptor.len()),
        };
        reader.arm_field(0);
        reader
    }

    /// Sets up `scratch`/`target`/`stage` for field `index`, or leaves
    /// the reader in a terminal state if `index` is past the end of the
    /// descriptor (callers check `field_index == descriptor.len()`
    /// instead of calling this directly).
    fn arm_field(&mut self, index: usize) {
        self.field_index = index;
        self.scratch.clear();
        if index >= self.descriptor.len() {
            return;
        }
        let field = self.descriptor[index];
        match field {
            Field::Integer(_) | Field::Uuid | Field::Blob(_) | Field::Transaction => {
                self.stage = Stage::Fixed;
                self.target = field.fixed_size().expect("fixed-size field");
            }
            Field::Buffer(width) => {
                self.stage = Stage::BufferLen(width);
                self.target = width.prefix_bytes();
            }
            Field::BufferRedundant(width) => {
                self.stage = Stage::RedundantOuterLen(width);
                self.target = width.prefix_bytes();
            }
            Field::String => {
                self.stage = Stage::StringLen;
                self.target = 2;
            }
        }
    }

    /// Feeds as much of `input` as needed to make progress, advancing
    /// `input` past the consumed bytes. Returns `Ok(Some(values))` once a
    /// full message body has been parsed — the reader resets itself and
    /// is immediately ready to parse the next message, and any bytes
    /// remaining in `input` belong to that next message. Returns
    /// `Ok(None)` if `input` was exhausted before the message completed.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::LengthOverflow`] if a length prefix exceeds
    /// [`MAX_FIELD_LEN`], [`WireError::RedundantLengthMismatch`] if a
    /// `BufferRedundant` field's two copies disagree, or
    /// [`WireError::InvalidUtf16`] if a string is not valid UTF-16.
    pub fn feed(&mut self, input: &mut &[u8]) -> Result<Option<Vec<FieldValue>>, WireError> {
        loop {
            if self.field_index >= self.descriptor.len() {
                let values = std::mem::replace(&mut self.values, Vec::new());
                self.arm_field(0);
                self.values = Vec::with_capacity(self.descriptor.len());
                return Ok(Some(values));
            }
            if input.is_empty() {
                return Ok(None);
            }
            let need = self.target - self.scratch.len();
            let take = need.min(input.len());
            self.scratch.extend_from_slice(&input[..take]);
            *input = &input[take..];
            if self.scratch.len() < self.target {
                return Ok(None);
            }
            self.advance_stage()?;
        }
    }

    /// Called once `self.scratch` has accumulated exactly `self.target`
    /// bytes for the current stage; transitions to the next stage or
    /// finalizes the field.
    fn advance_stage(&mut self) -> Result<(), WireError> {
        match self.stage {
            Stage::Fixed => {
                let field = self.descriptor[self.field_index];
                let value = finalize_fixed(field, &self.scratch);
                self.values.push(value);
                self.arm_field(self.field_index + 1);
            }
            Stage::BufferLen(width) => {
                let len = width.read(&self.scratch);
                if len > MAX_FIELD_LEN {
                    warn!(len, max = MAX_FIELD_LEN, "buffer length exceeds ceiling");
                    return Err(WireError::LengthOverflow(len));
                }
                self.stage = Stage::BufferPayload;
                self.target = len as usize;
                self.scratch.clear();
            }
            Stage::BufferPayload => {
                self.values.push(FieldValue::Buffer(std::mem::take(&mut self.scratch)));
                self.arm_field(self.field_index + 1);
            }
            Stage::RedundantOuterLen(width) => {
                let outer = width.read(&self.scratch);
                if outer > MAX_FIELD_LEN {
                    warn!(len = outer, max = MAX_FIELD_LEN, "buffer length exceeds ceiling");
                    return Err(WireError::LengthOverflow(outer));
                }
                self.stage = Stage::RedundantInnerLen(width, outer);
                self.target = width.prefix_bytes();
                self.scratch.clear();
            }
            Stage::RedundantInnerLen(width, outer) => {
                let inner = width.read(&self.scratch);
                if inner != outer {
                    warn!(outer, inner, "redundant buffer length copies disagree");
                    return Err(WireError::RedundantLengthMismatch { outer, inner });
                }
                self.stage = Stage::RedundantPayload;
                self.target = outer as usize;
                self.scratch.clear();
            }
            Stage::RedundantPayload => {
                self.values.push(FieldValue::Buffer(std::mem::take(&mut self.scratch)));
                self.arm_field(self.field_index + 1);
            }
            Stage::StringLen => {
                let unit_count = u32::from(crate::codec::read_u16(&self.scratch));
                self.stage = Stage::StringPayload;
                self.target = (unit_count as usize) * 2;
                self.scratch.clear();
            }
            Stage::StringPayload => {
                let mut units = Vec::with_capacity(self.scratch.len() / 2);
                for chunk in self.scratch.chunks_exact(2) {
                    units.push(crate::codec::read_u16(chunk));
                }
                let s = String::from_utf16(&units).map_err(|_| WireError::InvalidUtf16)?;
                self.values.push(FieldValue::Str(s));
                self.arm_field(self.field_index + 1);
            }
        }
        Ok(())
    }
}

fn finalize_fixed(field: Field, scratch: &[u8]) -> FieldValue {
    match field {
        Field::Integer(1) => FieldValue::Int(u64::from(scratch[0])),
        Field::Integer(2) => FieldValue::Int(u64::from(crate::codec::read_u16(scratch))),
        Field::Integer(4) => FieldValue::Int(u64::from(crate::codec::read_u32(scratch))),
        Field::Integer(8) => FieldValue::Int(crate::codec::read_u64(scratch)),
        Field::Integer(_) => unreachable!("descriptors only use 1/2/4/8-byte integers"),
        Field::Uuid => {
            let mut u = [0u8; 16];
            u.copy_from_slice(scratch);
            FieldValue::Uuid(u)
        }
        Field::Blob(_) => FieldValue::Blob(scratch.to_vec()),
        Field::Transaction => FieldValue::Transaction(crate::codec::read_u32(scratch)),
        Field::Buffer(_) | Field::BufferRedundant(_) | Field::String => {
            unreachable!("variable-width fields never use Stage::Fixed")
        }
    }
}
