//! Password and login-challenge hashing.
//!
//! Legacy accounts were created under SHA-0 — the original, uncorrected
//! predecessor to SHA-1 that differs only in the message schedule's
//! missing left-rotate. No registry crate implements it (it has no
//! legitimate modern use outside reproducing exactly this kind of
//! legacy compatibility bit), so [`sha0`] hand-rolls the compression
//! function; accounts created going forward always use SHA-1 via the
//! [`sha1`] crate.

use sha1::{Digest, Sha1};

/// Which digest an account's stored password hash was computed with,
/// recorded by [`crate::flags::AccountFlags::HASH_SHA1`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// The legacy, uncorrected digest.
    Sha0,
    /// The modern digest new accounts are created with.
    Sha1,
}

/// Hashes `name` and `password` together into the stored account
/// credential. Mixing the name in prevents two accounts that happen to
/// share a password from sharing a stored hash.
#[must_use]
pub fn acct_hash(name: &str, password: &str, algorithm: HashAlgorithm) -> [u8; 20] {
    let mut input = Vec::with_capacity(name.len() + password.len());
    input.extend_from_slice(name.to_lowercase().as_bytes());
    input.extend_from_slice(password.as_bytes());
    match algorithm {
        HashAlgorithm::Sha0 => sha0(&input),
        HashAlgorithm::Sha1 => {
            let mut hasher = Sha1::new();
            hasher.update(&input);
            hasher.finalize().into()
        }
    }
}

/// Combines a stored `acct_hash` with the login challenge nonces into
/// the value the client actually sends, so the stored hash itself never
/// crosses the wire. Always SHA-1, independent of the account's own
/// algorithm, since the challenge hash is newly computed at login time.
#[must_use]
pub fn login_hash(acct_hash: &[u8], cli_challenge: u32, srv_challenge: u32) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(acct_hash);
    hasher.update(cli_challenge.to_le_bytes());
    hasher.update(srv_challenge.to_le_bytes());
    hasher.finalize().into()
}

/// SHA-0: identical to SHA-1's compression function except the message
/// schedule extends `W[16..80]` without the left-rotate-by-1 that SHA-1
/// added as a correction.
fn sha0(message: &[u8]) -> [u8; 20] {
    let mut h: [u32; 5] = [0x6745_2301, 0xEFCD_AB89, 0x98BA_DCFE, 0x1032_5476, 0xC3D2_E1F0];

    let mut padded = message.to_vec();
    let bit_len = (message.len() as u64).wrapping_mul(8);
    padded.push(0x80);
    while padded.len() % 64 != 56 {
        padded.push(0);
    }
    padded.extend_from_slice(&bit_len.to_be_bytes());

    for block in padded.chunks_exact(64) {
        let mut w = [0u32; 80];
        for (i, word) in block.chunks_exact(4).enumerate() {
            w[i] = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
        }
        for i in 16..80 {
            w[i] = w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16];
        }

        let (mut a, mut b, mut c, mut d, mut e) = (h[0], h[1], h[2], h[3], h[4]);
        for (i, word) in w.iter().enumerate() {
            let (f, k) = match i {
                0..=19 => ((b & c) | ((!b) & d), 0x5A82_7999u32),
                20..=39 => (b ^ c ^ d, 0x6ED9_EBA1),
                40..=59 => ((b & c) | (b & d) | (c & d), 0x8F1B_BCDC),
                _ => (b ^ c ^ d, 0xCA62_C1D6),
            };
            let temp = a
                .rotate_left(5)
                .wrapping_add(f)
                .wrapping_add(e)
                .wrapping_add(k)
                .wrapping_add(*word);
            e = d;
            d = c;
            c = b.rotate_left(30);
            b = a;
            a = temp;
        }

        h[0] = h[0].wrapping_add(a);
        h[1] = h[1].wrapping_add(b);
        h[2] = h[2].wrapping_add(c);
        h[3] = h[3].wrapping_add(d);
        h[4] = h[4].wrapping_add(e);
    }

    let mut out = [0u8; 20];
    for (i, word) in h.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&word.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha0_is_deterministic_and_fixed_width() {
        let a = sha0(b"the quick brown fox");
        let b = sha0(b"the quick brown fox");
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
        assert_ne!(a, sha0(b"the quick brown fox."));
    }

    #[test]
    fn acct_hash_differs_between_algorithms() {
        let sha0_hash = acct_hash("alice", "pw", HashAlgorithm::Sha0);
        let sha1_hash = acct_hash("alice", "pw", HashAlgorithm::Sha1);
        assert_ne!(sha0_hash, sha1_hash);
    }

    #[test]
    fn login_hash_changes_with_either_challenge() {
        let stored = acct_hash("alice", "pw", HashAlgorithm::Sha1);
        let a = login_hash(&stored, 0xAAAA, 0xBBBB);
        let b = login_hash(&stored, 0xAAAA, 0xCCCC);
        let c = login_hash(&stored, 0xDDDD, 0xBBBB);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn scenario_4_wrong_password_changes_the_login_hash() {
        let correct = acct_hash("alice", "pw", HashAlgorithm::Sha1);
        let wrong = acct_hash("alice", "not-pw", HashAlgorithm::Sha1);
        assert_ne!(
            login_hash(&correct, 0xAAAA, 0xBBBB),
            login_hash(&wrong, 0xAAAA, 0xBBBB)
        );
    }
}
