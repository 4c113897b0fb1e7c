//! Message descriptors for the account protocol operations (component
//! J) and the admin wall broadcast, plus the mixed-endian uuid
//! conversions the wire layer and `uuid::Uuid` need to agree on.
//!
//! Each descriptor here is dedicated to one connection's purpose (an
//! admin-daemon-to-db-daemon link speaks only `ACCT_CREATE_*`, a client
//! login link only speaks `ACCT_LOGIN_*`); there is no multiplexed
//! `u16` message-type tag shared across descriptors on one connection,
//! matching how `net::connection::Connection` is already built — one
//! `MessageReader`, bound to one descriptor, per connection.

use uuid::Uuid;
use wire::codec::{uuid_fields, uuid_from_fields, WireUuid};
use wire::{Field, LengthWidth};

/// `acctCreate(name, password, flags) -> uuid`, sent by an admin daemon
/// acting as a db client.
pub const ACCT_CREATE_REQUEST: &[Field] = &[
    Field::Transaction,
    Field::String,
    Field::String,
    Field::Integer(4),
];

/// The db daemon's reply to [`ACCT_CREATE_REQUEST`].
pub const ACCT_CREATE_REPLY: &[Field] = &[Field::Transaction, Field::Integer(4), Field::Uuid];

/// `acctAuthRequest(name, presentedHash, cliChallenge, srvChallenge)`,
/// sent by the auth daemon to the db daemon on a client login attempt.
pub const ACCT_AUTH_REQUEST: &[Field] = &[
    Field::Transaction,
    Field::String,
    Field::Blob(20),
    Field::Integer(4),
    Field::Integer(4),
];

/// The db daemon's reply to [`ACCT_AUTH_REQUEST`]: `(uuid, flags)` on
/// success.
pub const ACCT_AUTH_REPLY: &[Field] =
    &[Field::Transaction, Field::Integer(4), Field::Uuid, Field::Integer(4)];

/// `acctLoginRequest(cliChallenge, name, challengeHash)`, sent by a
/// game/viewer client to the auth daemon.
pub const ACCT_LOGIN_REQUEST: &[Field] = &[
    Field::Transaction,
    Field::Integer(4),
    Field::String,
    Field::Blob(20),
];

/// The auth daemon's reply to [`ACCT_LOGIN_REQUEST`].
pub const ACCT_LOGIN_REPLY: &[Field] =
    &[Field::Transaction, Field::Integer(4), Field::Uuid, Field::Integer(4)];

/// `wallRequest(message)`, sent by an authenticated admin client.
pub const WALL_REQUEST: &[Field] = &[Field::Transaction, Field::String];

/// `wallBCast(fromName, message)`, pushed to every other connected
/// admin client.
pub const WALL_BCAST: &[Field] = &[Field::String, Field::String];

/// A one-byte tag an admin client sends ahead of every request on its
/// `Cli2Admin` connection, so the single long-lived connection can
/// carry both the `wall` broadcast and the `acctCreate` proxy (§4.6)
/// instead of being limited to the one descriptor a connection is
/// otherwise bound to for its whole lifetime -- see
/// [`net::Connection::rebind`].
pub const CLI_ADMIN_REQUEST_TAG: &[Field] = &[Field::Integer(1)];

/// [`CLI_ADMIN_REQUEST_TAG`] value preceding a [`WALL_REQUEST`] body.
pub const CLI_ADMIN_TAG_WALL: u64 = 0;

/// [`CLI_ADMIN_REQUEST_TAG`] value preceding a
/// [`CLI_ACCT_CREATE_REQUEST`] body.
pub const CLI_ADMIN_TAG_ACCT_CREATE: u64 = 1;

/// `acctCreate(name, password, flags)`, sent directly by a connected
/// admin client (as opposed to [`ACCT_CREATE_REQUEST`], the admin
/// daemon's own internal proxy call to the db daemon).
pub const CLI_ACCT_CREATE_REQUEST: &[Field] = &[
    Field::Transaction,
    Field::String,
    Field::String,
    Field::Integer(4),
];

/// The admin daemon's reply to [`CLI_ACCT_CREATE_REQUEST`]: a
/// [`net_error::NetError`] wire code plus the new account's uuid on
/// success.
pub const CLI_ACCT_CREATE_REPLY: &[Field] = &[Field::Transaction, Field::Integer(4), Field::Uuid];

/// The auth daemon's one-shot `srvChallenge`, written immediately after
/// accept so the client can fold it into its login hash before sending
/// [`ACCT_LOGIN_REQUEST`].
pub const AUTH_CHALLENGE: &[Field] = &[Field::Integer(4)];

/// A one-byte tag an admin/auth daemon's internal db client writes
/// immediately after its handshake completes, telling the db daemon's
/// single accept loop which descriptor pair the rest of the connection
/// speaks (the db daemon cannot otherwise distinguish an admin peer
/// from an auth peer -- both dial in as `Srv2Database`).
pub const DB_ROLE_TAG: &[Field] = &[Field::Integer(1)];

/// [`DB_ROLE_TAG`] value announcing an `acctCreate`-speaking peer (the
/// admin daemon).
pub const DB_ROLE_ADMIN: u64 = 0;

/// [`DB_ROLE_TAG`] value announcing an `acctAuthRequest`-speaking peer
/// (the auth daemon).
pub const DB_ROLE_AUTH: u64 = 1;

/// Extended-auth redundant-length buffer, exercised generically (see
/// the open-question note in the design ledger): outer and inner
/// length must agree or the message is rejected.
pub const EXTENDED_AUTH_BLOB: &[Field] = &[Field::Transaction, Field::BufferRedundant(LengthWidth::Medium)];

/// Converts a standard [`Uuid`] to the mixed-endian wire layout shared
/// with `net::conn_header::ConnectData::product_id`.
#[must_use]
pub fn uuid_to_wire(id: Uuid) -> WireUuid {
    let (d1, d2, d3, d4) = id.as_fields();
    uuid_from_fields(d1, d2, d3, *d4)
}

/// The inverse of [`uuid_to_wire`].
#[must_use]
pub fn uuid_from_wire(bytes: WireUuid) -> Uuid {
    let (d1, d2, d3, d4) = uuid_fields(&bytes);
    Uuid::from_fields(d1, d2, d3, &d4)
}
