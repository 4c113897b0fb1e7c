//! Fixed-width little-endian integer and UUID codec helpers.
//!
//! Every integer on the wire is little-endian. UUIDs use the mixed-endian
//! "Microsoft GUID" layout: the first three fields (`u32`, `u16`, `u16`)
//! are little-endian, the trailing 8-byte node/clock-sequence block is
//! taken byte-for-byte (big-endian, i.e. wire order).

/// A 16-byte UUID in the mixed-endian layout used throughout the wire
/// protocol.
pub type WireUuid = [u8; 16];

/// Reads a `u16` from the front of `buf` in little-endian order.
#[must_use]
pub fn read_u16(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}

/// Reads a `u32` from the front of `buf` in little-endian order.
#[must_use]
pub fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Reads a `u64` from the front of `buf` in little-endian order.
#[must_use]
pub fn read_u64(buf: &[u8]) -> u64 {
    u64::from_le_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

/// Appends a `u16` to `out` in little-endian order.
pub fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Appends a `u32` to `out` in little-endian order.
pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Appends a `u64` to `out` in little-endian order.
pub fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Reassembles a [`WireUuid`] from its on-wire bytes. The layout is
/// mixed-endian: `data1` (u32 LE), `data2` (u16 LE), `data3` (u16 LE),
/// then 8 raw bytes taken verbatim.
#[must_use]
pub fn uuid_from_wire_bytes(bytes: &[u8; 16]) -> WireUuid {
    *bytes
}

/// Decodes the four logical fields of a mixed-endian UUID for inspection
/// or re-encoding in another representation.
#[must_use]
pub fn uuid_fields(uuid: &WireUuid) -> (u32, u16, u16, [u8; 8]) {
    let data1 = read_u32(&uuid[0..4]);
    let data2 = read_u16(&uuid[4..6]);
    let data3 = read_u16(&uuid[6..8]);
    let mut rest = [0u8; 8];
    rest.copy_from_slice(&uuid[8..16]);
    (data1, data2, data3, rest)
}

/// Builds a mixed-endian [`WireUuid`] from its logical fields.
#[must_use]
pub fn uuid_from_fields(data1: u32, data2: u16, data3: u16, rest: [u8; 8]) -> WireUuid {
    let mut out = [0u8; 16];
    out[0..4].copy_from_slice(&data1.to_le_bytes());
    out[4..6].copy_from_slice(&data2.to_le_bytes());
    out[6..8].copy_from_slice(&data3.to_le_bytes());
    out[8..16].copy_from_slice(&rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_round_trip() {
        let mut out = Vec::new();
        write_u16(&mut out, 0x0102);
        write_u32(&mut out, 0x0102_0304);
        write_u64(&mut out, 0x0102_0304_0506_0708);
        assert_eq!(out[0..2], [0x02, 0x01]);
        assert_eq!(read_u16(&out[0..2]), 0x0102);
        assert_eq!(read_u32(&out[2..6]), 0x0102_0304);
        assert_eq!(read_u64(&out[6..14]), 0x0102_0304_0506_0708);
    }

    #[test]
    fn uuid_field_round_trip() {
        let rest = [1, 2, 3, 4, 5, 6, 7, 8];
        let uuid = uuid_from_fields(0xAABB_CCDD, 0x1122, 0x3344, rest);
        let (d1, d2, d3, r) = uuid_fields(&uuid);
        assert_eq!(d1, 0xAABB_CCDD);
        assert_eq!(d2, 0x1122);
        assert_eq!(d3, 0x3344);
        assert_eq!(r, rest);
        // first three fields are little-endian on the wire
        assert_eq!(&uuid[0..4], &0xAABB_CCDDu32.to_le_bytes());
        assert_eq!(&uuid[8..16], &rest);
    }
}
