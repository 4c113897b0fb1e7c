//! Build/branch/product verification policy applied to connect-data
//! before the crypt handshake is offered.

use wire::codec::WireUuid;

use crate::conn_header::{ConnType, ConnectData};

/// How strictly a freshly accepted connection's declared identity is
/// checked against this daemon's configured expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationPolicy {
    /// Accept every connection regardless of declared identity.
    None,
    /// Match build/branch for auth/game/db connections; ignore file and
    /// gate.
    #[default]
    Default,
    /// Also match `productId` on file and gate connections.
    Strict,
}

/// What this daemon expects a connecting client to declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedIdentity {
    pub build_id: u32,
    pub branch_id: u32,
    pub product_id: WireUuid,
}

impl VerificationPolicy {
    /// Returns `true` if `data`'s declared identity satisfies this
    /// policy for a connection of kind `conn_type`.
    #[must_use]
    pub fn check(self, conn_type: ConnType, data: &ConnectData, expected: &ExpectedIdentity) -> bool {
        match self {
            Self::None => true,
            Self::Default => match conn_type {
                ConnType::Cli2Auth | ConnType::Cli2Game | ConnType::Srv2Database => {
                    data.build_id == expected.build_id && data.branch_id == expected.branch_id
                }
                ConnType::Cli2File | ConnType::Cli2Gate => true,
                ConnType::Cli2Admin => {
                    data.build_id == expected.build_id && data.branch_id == expected.branch_id
                }
            },
            Self::Strict => {
                let build_branch_ok = match conn_type {
                    ConnType::Cli2File | ConnType::Cli2Gate => true,
                    _ => data.build_id == expected.build_id && data.branch_id == expected.branch_id,
                };
                let product_ok = match conn_type {
                    ConnType::Cli2File | ConnType::Cli2Gate => data.product_id == expected.product_id,
                    _ => true,
                };
                build_branch_ok && product_ok
            }
        }
    }
}
