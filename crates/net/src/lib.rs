//! Connection state, the intrusive client list, and the lobby
//! dispatcher.
//!
//! # Overview
//!
//! [`dispatcher::Lobby`] is the one TCP acceptor every daemon process
//! shares: it reads the [`conn_header::ConnHeader`] and
//! [`conn_header::ConnectData`] off each new socket, checks them against
//! a [`policy::VerificationPolicy`], and routes the still-open socket to
//! whichever role claimed that connection type. The role's own accept
//! routine then runs the crypt handshake (see the `crypt` crate) and
//! wraps the result in a [`connection::Connection`], registering it in a
//! [`clients::ClientTable`].
//!
//! # Design
//!
//! The client list is a generational arena rather than an intrusive
//! linked list: a [`clients::ClientId`] stays meaningful even after
//! other clients disconnect and their slots are reused.

pub mod clients;
pub mod conn_header;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod policy;

pub use clients::{ClientId, ClientTable};
pub use conn_header::{ConnHeader, ConnType, ConnectData};
pub use connection::{Connection, MessageSink};
pub use dispatcher::{AcceptedConnection, Lobby};
pub use error::ConnError;
pub use policy::{ExpectedIdentity, VerificationPolicy};
