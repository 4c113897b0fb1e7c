//! Little-endian wire codec, declarative net-struct descriptors, and a
//! streaming message-body reader for the shard protocol.
//!
//! # Overview
//!
//! A message on the wire is a small fixed header (type id, and for
//! transaction-bearing messages a transaction id) followed by a body
//! whose layout is described by a [`descriptor::Descriptor`] — an
//! ordered list of [`descriptor::Field`]s. This crate has no opinion on
//! sockets or connection lifecycle; it only knows how to turn bytes into
//! [`value::FieldValue`]s and back.
//!
//! # Design
//!
//! [`value::encode_message`] / [`value::decode_message`] operate on a
//! complete, already-buffered body and are the right tool for small
//! fixed-size handshake messages and for tests. [`reader::MessageReader`]
//! is the streaming counterpart driven by a connection's read loop,
//! accumulating a body across however many socket reads it takes.
//!
//! # Errors
//!
//! All fallible operations return [`error::WireError`].
//!
//! # Examples
//!
//! ```
//! use wire::descriptor::{Descriptor, Field};
//! use wire::value::{encode_message, decode_message, FieldValue};
//!
//! const GREETING: Descriptor = &[Field::Integer(2), Field::String];
//! let values = vec![FieldValue::Int(1), FieldValue::Str("hi".into())];
//! let mut bytes = Vec::new();
//! encode_message(GREETING, &values, &mut bytes).unwrap();
//! assert_eq!(decode_message(GREETING, &bytes).unwrap(), values);
//! ```
//!
//! # See also
//!
//! [`crypt`](../crypt/index.html) wraps an established connection's byte
//! stream in a cipher; [`net`](../net/index.html) owns the socket and
//! drives a [`reader::MessageReader`] per connection.

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod reader;
pub mod value;

pub use descriptor::{Descriptor, Field, LengthWidth};
pub use error::WireError;
pub use reader::MessageReader;
pub use value::FieldValue;
