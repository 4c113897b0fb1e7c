//! DH-style key material: per-role generators, safe-prime generation,
//! and the base-64 persistence format used by the configuration file.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::Rng;

use crate::error::CryptError;

/// The small public DH generator used by each daemon role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Auth,
    Db,
    Game,
    Gate,
}

impl Role {
    /// The generator `G` fixed for this role.
    #[must_use]
    pub fn generator(self) -> u32 {
        match self {
            Self::Admin => 19,
            Self::Auth => 41,
            Self::Db => 19,
            Self::Game => 73,
            Self::Gate => 4,
        }
    }
}

/// `(K, N, X)` for a responder role: `K` is the private key, `N` the
/// modulus, `X = G^K mod N` the published public key.
#[derive(Debug, Clone)]
pub struct KeySet {
    pub k: BigUint,
    pub n: BigUint,
    pub x: BigUint,
}

impl KeySet {
    /// Generates a fresh `(K, N, X)` for `role`, choosing a random safe
    /// prime `N` of `bits` width and a random private key `K < N`.
    #[must_use]
    pub fn generate(role: Role, bits: u64) -> Self {
        let mut rng = rand::thread_rng();
        let n = random_safe_prime(&mut rng, bits);
        let k = loop {
            let candidate = rng.gen_biguint_below(&n);
            if !candidate.is_zero() {
                break candidate;
            }
        };
        let g = BigUint::from(role.generator());
        let x = g.modpow(&k, &n);
        Self { k, n, x }
    }

    /// Encodes `(K, N, X)` as the three base-64 strings stored under
    /// the `[crypt]` config section.
    #[must_use]
    pub fn to_base64(&self) -> (String, String, String) {
        (
            STANDARD.encode(self.k.to_bytes_be()),
            STANDARD.encode(self.n.to_bytes_be()),
            STANDARD.encode(self.x.to_bytes_be()),
        )
    }

    /// Decodes `(K, N, X)` from their base-64 config representation.
    ///
    /// # Errors
    ///
    /// Returns [`CryptError::InvalidBase64`] if any string is not valid
    /// base-64.
    pub fn from_base64(k: &str, n: &str, x: &str) -> Result<Self, CryptError> {
        Ok(Self {
            k: decode_biguint(k)?,
            n: decode_biguint(n)?,
            x: decode_biguint(x)?,
        })
    }
}

fn decode_biguint(s: &str) -> Result<BigUint, CryptError> {
    let bytes = STANDARD
        .decode(s)
        .map_err(|e| CryptError::InvalidBase64(e.to_string()))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Generates a random odd prime of `bits` width using a Miller-Rabin
/// test. "Safe" here means large enough for the short-lived per-daemon
/// handshake key; this is not used for anything requiring long-term
/// cryptographic strength.
fn random_safe_prime<R: Rng + ?Sized>(rng: &mut R, bits: u64) -> BigUint {
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(0, true);
        candidate.set_bit(bits - 1, true);
        if is_probably_prime(&candidate, 20) {
            return candidate;
        }
    }
}

/// Miller-Rabin primality test with `rounds` random witnesses.
fn is_probably_prime(n: &BigUint, rounds: u32) -> bool {
    let one = BigUint::one();
    let two = &one + &one;
    if *n < two {
        return false;
    }
    if *n == two {
        return true;
    }
    if n % &two == BigUint::zero() {
        return false;
    }

    let n_minus_one = n - &one;
    let mut d = n_minus_one.clone();
    let mut r = 0u32;
    while &d % &two == BigUint::zero() {
        d /= &two;
        r += 1;
    }

    let mut rng = rand::thread_rng();
    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &(n - &two));
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 0..r.saturating_sub(1) {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}
