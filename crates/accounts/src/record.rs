//! The account record as persisted by the db daemon.

use uuid::Uuid;

use crate::flags::AccountFlags;

/// `(name, password-hash, hash-algorithm, flags, uuid)` — the account
/// record external callers observe. `hash` is opaque to everyone but
/// the authenticate path; it is never sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub name: String,
    pub uuid: Uuid,
    pub hash: Vec<u8>,
    pub flags: AccountFlags,
}

impl AccountRecord {
    /// Whether this account's `BANNED` bit is set.
    #[must_use]
    pub fn is_banned(&self) -> bool {
        self.flags.contains(AccountFlags::BANNED)
    }

    /// Whether this account's `DISABLED` bit is set.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.flags.contains(AccountFlags::DISABLED)
    }
}
