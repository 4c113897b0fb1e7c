#![deny(unsafe_code)]
#![deny(missing_docs)]

//! The flat error enumeration that travels on the wire as a `u32`.
//!
//! Every reply message carries one of these codes (§7 of the protocol
//! design). The numeric values are part of the wire contract: once a
//! variant ships its discriminant must never change, and new codes are
//! appended rather than inserted.

/// Categories of failure a shard daemon can report to a peer.
///
/// The discriminants are stable across the whole cluster: an admin, auth,
/// or db daemon compiled from a different revision of this crate still
/// agrees on what `NetError::AccountNotFound as u32` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NetError {
    /// The operation completed normally.
    Success = 0,
    /// The request is still in flight; no final answer yet.
    Pending = 1,
    /// The request exceeded its caller-imposed deadline.
    Timeout = 2,
    /// A TCP connection attempt did not complete.
    ConnectFailed = 3,
    /// The peer closed the connection before a reply arrived.
    Disconnected = 4,
    /// The remote peer is shutting down.
    RemoteShutdown = 5,
    /// A message violated its descriptor (bad type byte, overlong length,
    /// mismatched redundant length field).
    BadServerData = 6,
    /// A request argument was out of range or otherwise invalid.
    InvalidParameter = 7,
    /// The daemon does not implement the requested operation.
    NotSupported = 8,
    /// `acctCreate` was issued for a name that already exists.
    AccountAlreadyExists = 9,
    /// No account exists with the requested name.
    AccountNotFound = 10,
    /// The presented credential did not match the stored hash.
    AuthenticationFailed = 11,
    /// The account exists and the credential matched, but policy refuses
    /// the login (e.g. disabled flag set).
    LoginDenied = 12,
    /// Too many recent failed login attempts for this account.
    TooManyFailedLogins = 13,
    /// The account is banned.
    AccountBanned = 14,
}

impl NetError {
    /// Recovers a [`NetError`] from its wire discriminant.
    ///
    /// Unknown codes collapse to [`NetError::NotSupported`] rather than
    /// panicking, since a newer peer may send a code this build predates.
    #[must_use]
    pub fn from_wire(code: u32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::Pending,
            2 => Self::Timeout,
            3 => Self::ConnectFailed,
            4 => Self::Disconnected,
            5 => Self::RemoteShutdown,
            6 => Self::BadServerData,
            7 => Self::InvalidParameter,
            9 => Self::AccountAlreadyExists,
            10 => Self::AccountNotFound,
            11 => Self::AuthenticationFailed,
            12 => Self::LoginDenied,
            13 => Self::TooManyFailedLogins,
            14 => Self::AccountBanned,
            _ => Self::NotSupported,
        }
    }

    /// The wire discriminant for this code.
    #[must_use]
    pub fn to_wire(self) -> u32 {
        self as u32
    }

    /// True for [`NetError::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for NetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::Pending => "pending",
            Self::Timeout => "timeout",
            Self::ConnectFailed => "connect failed",
            Self::Disconnected => "disconnected",
            Self::RemoteShutdown => "remote shutdown",
            Self::BadServerData => "bad server data",
            Self::InvalidParameter => "invalid parameter",
            Self::NotSupported => "not supported",
            Self::AccountAlreadyExists => "account already exists",
            Self::AccountNotFound => "account not found",
            Self::AuthenticationFailed => "authentication failed",
            Self::LoginDenied => "login denied",
            Self::TooManyFailedLogins => "too many failed logins",
            Self::AccountBanned => "account banned",
        };
        f.write_str(text)
    }
}

impl std::error::Error for NetError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_roundtrip_for_every_named_code() {
        let codes = [
            NetError::Success,
            NetError::Pending,
            NetError::Timeout,
            NetError::ConnectFailed,
            NetError::Disconnected,
            NetError::RemoteShutdown,
            NetError::BadServerData,
            NetError::InvalidParameter,
            NetError::AccountAlreadyExists,
            NetError::AccountNotFound,
            NetError::AuthenticationFailed,
            NetError::LoginDenied,
            NetError::TooManyFailedLogins,
            NetError::AccountBanned,
        ];
        for code in codes {
            assert_eq!(NetError::from_wire(code.to_wire()), code);
        }
    }

    #[test]
    fn unknown_code_collapses_to_not_supported() {
        assert_eq!(NetError::from_wire(0xFFFF_FFFF), NetError::NotSupported);
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(NetError::Success.to_wire(), 0);
        assert!(NetError::Success.is_success());
        assert!(!NetError::AccountBanned.is_success());
    }
}
