//! DH-style key exchange and RC4-style stream ciphers for the per-
//! connection handshake.
//!
//! # Overview
//!
//! Every connection starts cleartext and negotiates a 7-byte symmetric
//! session key via a two-message exchange ([`handshake`]), then keys
//! two independent stream ciphers ([`rc4`]) — one per direction. The
//! [`keys`] module generates and persists the per-daemon DH parameters
//! that the responder side of the handshake needs.
//!
//! # Errors
//!
//! All fallible operations return [`error::CryptError`].
//!
//! # See also
//!
//! [`wire`](../wire/index.html) frames the bytes that flow through the
//! cipher pair this crate produces; `net::connection` owns the
//! handshake's socket.

pub mod error;
pub mod handshake;
pub mod keys;
pub mod rc4;

pub use error::CryptError;
pub use handshake::{initiate, random_client_seed, respond, CipherPair, InitiatorParams, ResponderParams};
pub use keys::{KeySet, Role};
pub use rc4::Rc4;
