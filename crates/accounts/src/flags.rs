//! Account role bits and the internal hash-algorithm bit, both packed
//! into the one `u32` persisted alongside an account record.

use bitflags::bitflags;

bitflags! {
    /// Role and state bits for an account, plus the internal bit
    /// recording which password-hash algorithm it was created under.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccountFlags: u32 {
        /// The account cannot log in until re-enabled.
        const DISABLED = 1 << 0;
        /// Full administrative privileges.
        const ADMIN = 1 << 1;
        /// Developer-only features are visible.
        const DEVELOPER = 1 << 2;
        /// Beta-program participant.
        const BETA = 1 << 3;
        /// An ordinary player account (the common case).
        const USER = 1 << 4;
        /// Reserved for time-limited promotional access.
        const SPECIAL_EVENT = 1 << 5;
        /// Login is refused and the reported error is `accountBanned`.
        const BANNED = 1 << 6;
        /// The stored password hash uses SHA-1 rather than the legacy
        /// SHA-0 variant. Unset means SHA-0.
        const HASH_SHA1 = 1 << 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_and_admin_compose() {
        let flags = AccountFlags::USER | AccountFlags::ADMIN;
        assert!(flags.contains(AccountFlags::USER));
        assert!(flags.contains(AccountFlags::ADMIN));
        assert!(!flags.contains(AccountFlags::BANNED));
    }

    #[test]
    fn round_trips_through_its_raw_bits() {
        let flags = AccountFlags::USER | AccountFlags::HASH_SHA1;
        let bits = flags.bits();
        assert_eq!(AccountFlags::from_bits_truncate(bits), flags);
    }
}
