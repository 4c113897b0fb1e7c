//! The 2-byte ConnHeader prelude sent by every new TCP connection, and
//! the connect-data blob that follows it.

use tokio::io::{AsyncRead, AsyncReadExt};
use wire::codec::WireUuid;

use crate::error::ConnError;

/// The role a freshly accepted connection is announcing itself as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnType {
    Cli2Auth,
    Cli2Game,
    Cli2File,
    Cli2Gate,
    Cli2Admin,
    Srv2Database,
}

impl ConnType {
    /// Maps the wire `connType` byte to a [`ConnType`].
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::UnknownConnType`] for any value this build
    /// does not recognize.
    pub fn from_wire(byte: u8) -> Result<Self, ConnError> {
        match byte {
            0 => Ok(Self::Cli2Auth),
            1 => Ok(Self::Cli2Game),
            2 => Ok(Self::Cli2File),
            3 => Ok(Self::Cli2Gate),
            4 => Ok(Self::Cli2Admin),
            5 => Ok(Self::Srv2Database),
            other => Err(ConnError::UnknownConnType(other)),
        }
    }

    /// The wire `connType` byte for this variant.
    #[must_use]
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Cli2Auth => 0,
            Self::Cli2Game => 1,
            Self::Cli2File => 2,
            Self::Cli2Gate => 3,
            Self::Cli2Admin => 4,
            Self::Srv2Database => 5,
        }
    }
}

/// The 2-byte prelude every new connection sends: `(connType,
/// hdrBytes)`, where `hdrBytes` is the length of the whole connect
/// message including these 2 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnHeader {
    pub conn_type: ConnType,
    pub hdr_bytes: u8,
}

impl ConnHeader {
    /// Reads and validates a [`ConnHeader`] from `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::UnknownConnType`] or
    /// [`ConnError::HeaderTooShort`] if the header is malformed.
    pub async fn read<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Self, ConnError> {
        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).await?;
        let conn_type = ConnType::from_wire(buf[0])?;
        let hdr_bytes = buf[1];
        if hdr_bytes < 2 {
            return Err(ConnError::HeaderTooShort(hdr_bytes));
        }
        Ok(Self {
            conn_type,
            hdr_bytes,
        })
    }

    /// Number of further bytes the connect-data blob occupies, beyond
    /// the ConnHeader itself.
    #[must_use]
    pub fn remaining_len(self) -> usize {
        usize::from(self.hdr_bytes) - 2
    }
}

/// The common prefix of every role's connect-data blob: build/branch
/// identity and product UUID, followed by role-specific trailing bytes
/// this crate does not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectData {
    pub build_id: u32,
    pub branch_id: u32,
    pub product_id: WireUuid,
    pub trailing: Vec<u8>,
}

impl ConnectData {
    /// Parses the common `(buildId, branchId, productId, ...)` prefix
    /// out of a raw connect-data blob, keeping whatever bytes remain as
    /// `trailing` for the role-specific accept handler to interpret.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::HeaderTooShort`] if `blob` is shorter than
    /// the 24-byte common prefix.
    pub fn parse(blob: &[u8]) -> Result<Self, ConnError> {
        const PREFIX_LEN: usize = 4 + 4 + 16;
        if blob.len() < PREFIX_LEN {
            return Err(ConnError::HeaderTooShort(blob.len() as u8));
        }
        let build_id = wire::codec::read_u32(&blob[0..4]);
        let branch_id = wire::codec::read_u32(&blob[4..8]);
        let mut product_id = [0u8; 16];
        product_id.copy_from_slice(&blob[8..24]);
        Ok(Self {
            build_id,
            branch_id,
            product_id,
            trailing: blob[PREFIX_LEN..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_a_well_formed_header() {
        let bytes = [4u8, 10]; // Cli2Admin, hdrBytes=10
        let mut cursor = &bytes[..];
        let header = ConnHeader::read(&mut cursor).await.unwrap();
        assert_eq!(header.conn_type, ConnType::Cli2Admin);
        assert_eq!(header.remaining_len(), 8);
    }

    #[test]
    fn rejects_unknown_conn_type() {
        assert!(matches!(
            ConnType::from_wire(200),
            Err(ConnError::UnknownConnType(200))
        ));
    }

    #[test]
    fn parses_common_connect_data_prefix() {
        let mut blob = Vec::new();
        blob.extend_from_slice(&42u32.to_le_bytes());
        blob.extend_from_slice(&7u32.to_le_bytes());
        blob.extend_from_slice(&[9u8; 16]);
        blob.extend_from_slice(b"extra");
        let data = ConnectData::parse(&blob).unwrap();
        assert_eq!(data.build_id, 42);
        assert_eq!(data.branch_id, 7);
        assert_eq!(data.product_id, [9u8; 16]);
        assert_eq!(data.trailing, b"extra");
    }
}
