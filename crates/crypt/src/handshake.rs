//! The two-message cleartext DH handshake that establishes a
//! connection's symmetric session key, and the cipher pair it produces.
//!
//! ```text
//! fresh ──accept/connect──▶ handshaking ──Y exchanged──▶ ciphered
//!                                  │
//!                                  └─malformed/truncated─▶ closed
//! ```

use num_bigint::BigUint;
use num_traits::Zero;
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::error::CryptError;
use crate::rc4::Rc4;

/// Width of the derived symmetric session key, in bytes.
pub const SESSION_KEY_LEN: usize = 7;

const MSG_TYPE_Y: u8 = 0;
const MSG_TYPE_SERVER_SEED: u8 = 1;

/// The two independent RC4 states a connection needs after a completed
/// handshake: one for bytes it writes, one for bytes it reads.
pub struct CipherPair {
    pub encrypt: Rc4,
    pub decrypt: Rc4,
}

impl CipherPair {
    #[must_use]
    fn from_key(key: &[u8; SESSION_KEY_LEN]) -> Self {
        Self {
            encrypt: Rc4::new(key),
            decrypt: Rc4::new(key),
        }
    }
}

/// Fixed per-daemon responder key material: `K` (private) and `N`
/// (modulus), loaded from config.
pub struct ResponderParams {
    pub k: BigUint,
    pub n: BigUint,
}

/// The responder's public key material, as published to clients via
/// configuration: the generator `G`, modulus `N`, and public value `X`.
pub struct InitiatorParams {
    pub g: u32,
    pub n: BigUint,
    pub x: BigUint,
}

/// Runs the responder (server) side of the handshake over an already
/// framed byte stream (after the lobby dispatcher has read the
/// ConnHeader and connect-data). Returns the derived cipher pair.
///
/// # Errors
///
/// Returns [`CryptError::Truncated`] if the stream closes mid-message,
/// [`CryptError::TypeMismatch`] if the initiator's message type byte is
/// wrong, or [`CryptError::LengthOverflow`] if the declared Y length
/// does not fit the message.
pub async fn respond<S>(stream: &mut S, params: &ResponderParams) -> Result<CipherPair, CryptError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut head = [0u8; 3];
    read_exact_or_truncated(stream, &mut head).await?;
    let (msg_type, size, y_len) = (head[0], head[1], head[2]);
    if msg_type != MSG_TYPE_Y {
        warn!(got = msg_type, "handshake initiator sent an unexpected message type");
        return Err(CryptError::TypeMismatch {
            expected: MSG_TYPE_Y,
            got: msg_type,
        });
    }
    if usize::from(size) != usize::from(y_len) + 3 {
        warn!(size, y_len, "handshake Y message size does not match its own length field");
        return Err(CryptError::LengthOverflow(size));
    }
    let mut y_bytes = vec![0u8; usize::from(y_len)];
    read_exact_or_truncated(stream, &mut y_bytes).await?;
    let y = BigUint::from_bytes_le(&y_bytes);

    let shared = y.modpow(&params.k, &params.n);
    let truncated = truncate_shared(&shared);

    let mut server_seed = [0u8; SESSION_KEY_LEN];
    rand::thread_rng().fill_bytes(&mut server_seed);

    let mut reply = Vec::with_capacity(2 + SESSION_KEY_LEN);
    reply.push(MSG_TYPE_SERVER_SEED);
    reply.push((2 + SESSION_KEY_LEN) as u8);
    reply.extend_from_slice(&server_seed);
    stream
        .write_all(&reply)
        .await
        .map_err(|_| CryptError::Truncated)?;

    let key = xor_key(&truncated, &server_seed);
    Ok(CipherPair::from_key(&key))
}

/// Runs the initiator (client) side of the handshake: sends `Y = G ^
/// client_seed mod N`, reads the server's seed, and derives the session
/// key as `X ^ client_seed mod N` XORed with that seed.
///
/// # Errors
///
/// See [`respond`].
pub async fn initiate<S>(
    stream: &mut S,
    params: &InitiatorParams,
    client_seed: &BigUint,
) -> Result<CipherPair, CryptError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let g = BigUint::from(params.g);
    let y = g.modpow(client_seed, &params.n);
    let y_bytes = y.to_bytes_le();
    let y_len = u8::try_from(y_bytes.len()).map_err(|_| CryptError::LengthOverflow(u8::MAX))?;

    let mut message = Vec::with_capacity(3 + y_bytes.len());
    message.push(MSG_TYPE_Y);
    message.push(y_len + 3);
    message.push(y_len);
    message.extend_from_slice(&y_bytes);
    stream
        .write_all(&message)
        .await
        .map_err(|_| CryptError::Truncated)?;

    let mut head = [0u8; 2];
    read_exact_or_truncated(stream, &mut head).await?;
    let (msg_type, size) = (head[0], head[1]);
    if msg_type != MSG_TYPE_SERVER_SEED {
        warn!(got = msg_type, "handshake responder sent an unexpected message type");
        return Err(CryptError::TypeMismatch {
            expected: MSG_TYPE_SERVER_SEED,
            got: msg_type,
        });
    }
    if usize::from(size) != 2 + SESSION_KEY_LEN {
        return Err(CryptError::LengthOverflow(size));
    }
    let mut server_seed = [0u8; SESSION_KEY_LEN];
    read_exact_or_truncated(stream, &mut server_seed).await?;

    let shared = params.x.modpow(client_seed, &params.n);
    let truncated = truncate_shared(&shared);
    let key = xor_key(&truncated, &server_seed);
    Ok(CipherPair::from_key(&key))
}

/// Picks a fresh random client-seed exponent below `n`, the per-
/// connection secret an initiator raises `G` to when starting a
/// handshake.
#[must_use]
pub fn random_client_seed(n: &BigUint) -> BigUint {
    use num_bigint::RandBigInt;
    loop {
        let candidate = rand::thread_rng().gen_biguint_below(n);
        if !candidate.is_zero() {
            return candidate;
        }
    }
}

async fn read_exact_or_truncated<S>(stream: &mut S, buf: &mut [u8]) -> Result<(), CryptError>
where
    S: AsyncRead + Unpin,
{
    stream
        .read_exact(buf)
        .await
        .map_err(|_| CryptError::Truncated)?;
    Ok(())
}

/// Truncates (or zero-pads) a shared secret to [`SESSION_KEY_LEN`]
/// bytes, taking the value's least-significant bytes first — matching
/// how a small integer is laid out when copied directly into a fixed
/// little-endian buffer.
fn truncate_shared(shared: &BigUint) -> [u8; SESSION_KEY_LEN] {
    let bytes = shared.to_bytes_le();
    let mut out = [0u8; SESSION_KEY_LEN];
    let n = bytes.len().min(SESSION_KEY_LEN);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

fn xor_key(truncated: &[u8; SESSION_KEY_LEN], seed: &[u8; SESSION_KEY_LEN]) -> [u8; SESSION_KEY_LEN] {
    let mut key = [0u8; SESSION_KEY_LEN];
    for i in 0..SESSION_KEY_LEN {
        key[i] = truncated[i] ^ seed[i];
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_client_seed_is_below_n_and_nonzero() {
        let n = BigUint::from(23u32);
        for _ in 0..50 {
            let seed = random_client_seed(&n);
            assert!(seed < n);
            assert!(!seed.is_zero());
        }
    }

    #[test]
    fn scenario_2_handshake_derives_the_literal_session_key() {
        // Y is given as 4 directly; responder combines it with its own
        // K=3, N=23 to reach the shared secret, matching the worked
        // values from end-to-end scenario 2.
        let n = BigUint::from(23u32);
        let k = BigUint::from(3u32);
        let y = BigUint::from(4u32);

        let shared = y.modpow(&k, &n);
        assert_eq!(shared, BigUint::from(18u32));

        let truncated = truncate_shared(&shared);
        assert_eq!(truncated, [0x12, 0, 0, 0, 0, 0, 0]);

        let server_seed = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let key = xor_key(&truncated, &server_seed);
        assert_eq!(key, [0x13, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
    }

    #[tokio::test]
    async fn initiator_and_responder_agree_on_a_session_key_over_a_duplex_stream() {
        let (mut client, mut server) = tokio::io::duplex(256);

        let n = BigUint::from(23u32);
        let k = BigUint::from(3u32);
        let g = 4u32;
        let x = BigUint::from(g).modpow(&k, &n);
        let client_seed = BigUint::from(5u32);

        let responder = ResponderParams { k, n: n.clone() };
        let initiator = InitiatorParams { g, n, x };

        let (server_result, client_result) = tokio::join!(
            respond(&mut server, &responder),
            initiate(&mut client, &initiator, &client_seed),
        );
        let mut server_pair = server_result.unwrap();
        let mut client_pair = client_result.unwrap();

        let mut message = b"ping".to_vec();
        client_pair.encrypt.apply(&mut message);
        server_pair.decrypt.apply(&mut message);
        assert_eq!(&message, b"ping");
    }
}
