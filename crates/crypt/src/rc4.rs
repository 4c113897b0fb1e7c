//! An RC4-style stream cipher, keyed once per connection direction.
//!
//! Two independent [`Rc4`] states key a single connection — one for the
//! bytes it writes, one for the bytes it reads — so that the cipher
//! stream never depends on which side produced which bytes.

use zeroize::Zeroize;

/// A keyed RC4 state. `apply` both encrypts and decrypts: RC4 is its
/// own inverse, XORing the keystream into the data in place.
pub struct Rc4 {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Runs the key-scheduling algorithm over `key` (the key may be any
    /// non-empty length; the session keys produced by
    /// [`crate::handshake`] are always 7 bytes).
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        debug_assert!(!key.is_empty(), "RC4 requires a non-empty key");
        let mut state = [0u8; 256];
        for (idx, slot) in state.iter_mut().enumerate() {
            *slot = idx as u8;
        }
        let mut j = 0u8;
        for i in 0..256 {
            j = j
                .wrapping_add(state[i])
                .wrapping_add(key[i % key.len().max(1)]);
            state.swap(i, j as usize);
        }
        Self { state, i: 0, j: 0 }
    }

    /// XORs the pseudo-random generation algorithm's keystream into
    /// `data` in place, advancing this cipher's internal position.
    pub fn apply(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.state[self.i as usize]);
            self.state.swap(self.i as usize, self.j as usize);
            let k = self.state
                [(self.state[self.i as usize].wrapping_add(self.state[self.j as usize])) as usize];
            *byte ^= k;
        }
    }
}

impl Drop for Rc4 {
    fn drop(&mut self) {
        self.state.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypt_undoes_encrypt() {
        let key = b"\x13\x02\x03\x04\x05\x06\x07";
        let plaintext = b"the quick brown fox jumps over the lazy dog".to_vec();

        let mut encrypt = Rc4::new(key);
        let mut ciphertext = plaintext.clone();
        encrypt.apply(&mut ciphertext);
        assert_ne!(ciphertext, plaintext);

        let mut decrypt = Rc4::new(key);
        let mut recovered = ciphertext;
        decrypt.apply(&mut recovered);
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn independent_directions_do_not_interfere() {
        let key = b"\x01\x02\x03\x04\x05\x06\x07";
        let mut writer = Rc4::new(key);
        let mut reader = Rc4::new(key);

        let mut outbound = b"hello".to_vec();
        writer.apply(&mut outbound);
        let mut echoed = outbound.clone();
        reader.apply(&mut echoed);
        assert_eq!(echoed, b"hello");

        // keystreams advance independently of a second message on the
        // other direction's state
        let mut second_outbound = b"world".to_vec();
        writer.apply(&mut second_outbound);
        let mut second_echoed = second_outbound.clone();
        reader.apply(&mut second_echoed);
        assert_eq!(second_echoed, b"world");
    }
}
