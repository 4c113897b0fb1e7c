//! The db daemon: the sole holder of persistent account state. Every
//! connection here comes from either the admin daemon (`acctCreate`) or
//! the auth daemon (`acctAuthRequest`); [`DB_ROLE_TAG`] tells the two
//! apart on the one shared accept loop.

use std::ffi::OsString;
use std::io::Write;
use std::sync::Arc;

use clap::Parser;

use accounts::{AccountError, AccountFlags, AccountStore, SqliteAccountStore};
use net::{ConnError, Connection};
use net_error::NetError;
use wire::{FieldValue, WireError};

use crate::cli::{exit, handle_parse_error};
use crate::console::{self, ConsoleCommand};
use crate::error::DaemonError;
use crate::protocol::{
    uuid_to_wire, ACCT_AUTH_REPLY, ACCT_AUTH_REQUEST, ACCT_CREATE_REPLY, ACCT_CREATE_REQUEST,
    DB_ROLE_ADMIN, DB_ROLE_AUTH,
};

/// Shared state one db-daemon process holds: the account store every
/// connection's request loop programs against.
pub struct DbDaemon<S> {
    store: Arc<S>,
}

impl<S: AccountStore + Send + Sync + 'static> DbDaemon<S> {
    /// Builds the daemon state around an already-opened store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Reads the connection's one-byte role tag and drives the matching
    /// request loop until the peer disconnects.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError`] if the socket fails or the role tag is
    /// unrecognized.
    pub async fn handle_peer(&self, mut tagged: Connection) -> Result<(), ConnError> {
        let tag = tagged.read_message().await?;
        let Some(FieldValue::Int(role)) = tag.first().cloned() else {
            return Err(ConnError::Wire(WireError::ValueMismatch));
        };
        let (stream, cipher) = tagged.into_parts();
        match role {
            DB_ROLE_ADMIN => {
                let mut conn = Connection::new(stream, cipher, ACCT_CREATE_REQUEST);
                self.run_create_loop(&mut conn).await
            }
            DB_ROLE_AUTH => {
                let mut conn = Connection::new(stream, cipher, ACCT_AUTH_REQUEST);
                self.run_authenticate_loop(&mut conn).await
            }
            _ => Err(ConnError::Wire(WireError::ValueMismatch)),
        }
    }

    async fn run_create_loop(&self, conn: &mut Connection) -> Result<(), ConnError> {
        loop {
            let values = conn.read_message().await?;
            let Some(request) = parse_create_request(&values) else {
                continue;
            };
            let reply = match self
                .store
                .create(&request.name, &request.password, request.flags)
                .await
            {
                Ok(uuid) => vec![
                    FieldValue::Transaction(request.trans_id),
                    FieldValue::Int(NetError::Success.to_wire().into()),
                    FieldValue::Uuid(uuid_to_wire(uuid)),
                ],
                Err(error) => vec![
                    FieldValue::Transaction(request.trans_id),
                    FieldValue::Int(net_error_for(&error).to_wire().into()),
                    FieldValue::Uuid([0u8; 16]),
                ],
            };
            conn.write_message(ACCT_CREATE_REPLY, &reply).await?;
        }
    }

    async fn run_authenticate_loop(&self, conn: &mut Connection) -> Result<(), ConnError> {
        loop {
            let values = conn.read_message().await?;
            let Some(request) = parse_auth_request(&values) else {
                continue;
            };
            let reply = match self
                .store
                .authenticate(
                    &request.name,
                    request.cli_challenge,
                    request.srv_challenge,
                    &request.hash,
                )
                .await
            {
                Ok(result) => vec![
                    FieldValue::Transaction(request.trans_id),
                    FieldValue::Int(NetError::Success.to_wire().into()),
                    FieldValue::Uuid(uuid_to_wire(result.uuid)),
                    FieldValue::Int(u64::from(result.flags.bits())),
                ],
                Err(error) => vec![
                    FieldValue::Transaction(request.trans_id),
                    FieldValue::Int(net_error_for(&error).to_wire().into()),
                    FieldValue::Uuid([0u8; 16]),
                    FieldValue::Int(0),
                ],
            };
            conn.write_message(ACCT_AUTH_REPLY, &reply).await?;
        }
    }
}

fn net_error_for(error: &AccountError) -> NetError {
    match error {
        AccountError::AlreadyExists => NetError::AccountAlreadyExists,
        AccountError::NotFound => NetError::AccountNotFound,
        AccountError::AuthenticationFailed => NetError::AuthenticationFailed,
        AccountError::Banned => NetError::AccountBanned,
        AccountError::Backend(_) => NetError::NotSupported,
    }
}

struct CreateRequest {
    trans_id: u32,
    name: String,
    password: String,
    flags: AccountFlags,
}

fn parse_create_request(values: &[FieldValue]) -> Option<CreateRequest> {
    let trans_id = values.first()?.as_transaction()?;
    let name = match values.get(1)? {
        FieldValue::Str(s) => s.clone(),
        _ => return None,
    };
    let password = match values.get(2)? {
        FieldValue::Str(s) => s.clone(),
        _ => return None,
    };
    let flags = match values.get(3)? {
        FieldValue::Int(v) => AccountFlags::from_bits_truncate(u32::try_from(*v).ok()?),
        _ => return None,
    };
    Some(CreateRequest {
        trans_id,
        name,
        password,
        flags,
    })
}

struct AuthRequest {
    trans_id: u32,
    name: String,
    hash: Vec<u8>,
    cli_challenge: u32,
    srv_challenge: u32,
}

fn parse_auth_request(values: &[FieldValue]) -> Option<AuthRequest> {
    let trans_id = values.first()?.as_transaction()?;
    let name = match values.get(1)? {
        FieldValue::Str(s) => s.clone(),
        _ => return None,
    };
    let hash = match values.get(2)? {
        FieldValue::Blob(bytes) => bytes.clone(),
        _ => return None,
    };
    let cli_challenge = match values.get(3)? {
        FieldValue::Int(v) => u32::try_from(*v).ok()?,
        _ => return None,
    };
    let srv_challenge = match values.get(4)? {
        FieldValue::Int(v) => u32::try_from(*v).ok()?,
        _ => return None,
    };
    Some(AuthRequest {
        trans_id,
        name,
        hash,
        cli_challenge,
        srv_challenge,
    })
}

#[derive(Parser, Debug)]
#[command(name = "shard-db", version, about = "Db daemon: the sole holder of persistent account state")]
struct Args {
    /// Path to the ini-style configuration file.
    #[arg(long)]
    config: String,
}

/// The db daemon's CLI entry point.
///
/// # Errors
///
/// Never returns `Err`; failures are reported through the returned
/// status code (see [`crate::cli::exit`]).
pub fn run<I, S, Out, ErrW>(arguments: I, stdout: &mut Out, stderr: &mut ErrW) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    ErrW: Write,
{
    let args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    let parsed = match Args::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(error) => return handle_parse_error(error, stdout, stderr),
    };

    match run_inner(&parsed.config) {
        Ok(()) => exit::OK,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            error.exit_code()
        }
    }
}

fn run_inner(config_path: &str) -> Result<(), DaemonError> {
    let text = std::fs::read_to_string(config_path).map_err(|source| {
        DaemonError::Config(config::ConfigError::Io {
            path: config_path.to_string(),
            source,
        })
    })?;
    let shard_config = config::ShardConfig::parse(&text)?;
    let _guard = crate::logging::init(&shard_config.log.directory, shard_config.log.level)
        .map_err(DaemonError::Logging)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(DaemonError::Logging)?;
    runtime.block_on(serve(shard_config))
}

async fn serve(shard_config: config::ShardConfig) -> Result<(), DaemonError> {
    if shard_config.db_engine.engine != "sqlite" {
        return Err(DaemonError::Config(config::ConfigError::InvalidValue {
            section: "db".to_string(),
            key: "engine".to_string(),
            value: shard_config.db_engine.engine.clone(),
        }));
    }
    let store = Arc::new(SqliteAccountStore::open(&shard_config.db_engine.path)?);
    let daemon = Arc::new(DbDaemon::new(store));

    let own_role_keys = shard_config.crypt_keys("db")?;
    let own_key_set = crypt::KeySet::from_base64(
        &own_role_keys.k_base64,
        &own_role_keys.n_base64,
        &own_role_keys.x_base64,
    )?;
    let responder_params = Arc::new(crypt::ResponderParams {
        k: own_key_set.k,
        n: own_key_set.n,
    });

    let expected = net::ExpectedIdentity {
        build_id: shard_config.client.build_id,
        branch_id: shard_config.client.branch_id,
        product_id: [0u8; 16],
    };
    let mut lobby = net::Lobby::bind(
        &format!("{}:{}", shard_config.lobby.bindaddr, shard_config.lobby.port),
        shard_config.client.verification,
        expected,
    )
    .await
    .map_err(|_| DaemonError::Bind(std::io::Error::other("bind failed")))?;

    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    lobby.route(net::ConnType::Srv2Database, tx);

    let lobby_task = tokio::spawn(async move {
        let _ = lobby.run().await;
    });

    let mut console = console::spawn(std::io::stdin().lock());
    let mut connections = tokio::task::JoinSet::new();
    let started = std::time::Instant::now();

    loop {
        tokio::select! {
            command = console.recv() => {
                match command {
                    None | Some(ConsoleCommand::Quit) => break,
                    Some(ConsoleCommand::Help) => println!("{}", console::HELP_TEXT),
                    Some(ConsoleCommand::Status) => {
                        println!(
                            "db daemon: {} peer(s) connected, uptime {:?}",
                            connections.len(),
                            started.elapsed()
                        );
                    }
                    Some(ConsoleCommand::Wall(_)) => {
                        eprintln!("wall is only available on the admin daemon's console");
                    }
                }
            }
            accepted = rx.recv() => {
                let Some(accepted) = accepted else { break };
                let daemon = daemon.clone();
                let responder_params = responder_params.clone();
                connections.spawn(async move {
                    let mut stream = accepted.stream;
                    let Ok(cipher) = crypt::respond(&mut stream, &responder_params).await else {
                        return;
                    };
                    let conn = Connection::new(stream, cipher, crate::protocol::DB_ROLE_TAG);
                    let _ = daemon.handle_peer(conn).await;
                });
            }
            _ = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    lobby_task.abort();
    connections.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypt::{CipherPair, Rc4};
    use tokio::net::{TcpListener, TcpStream};

    use crate::protocol::DB_ROLE_TAG;
    use accounts::{acct_hash, login_hash, HashAlgorithm};

    const KEY: &[u8; 7] = b"\x01\x02\x03\x04\x05\x06\x07";

    fn cipher_pair() -> CipherPair {
        CipherPair {
            encrypt: Rc4::new(KEY),
            decrypt: Rc4::new(KEY),
        }
    }

    #[test]
    fn version_flag_reports_success_and_writes_to_stdout() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(["shard-db", "--version"], &mut stdout, &mut stderr);
        assert_eq!(status, exit::OK);
        assert!(!stdout.is_empty());
    }

    #[test]
    fn missing_config_flag_is_a_usage_error() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(["shard-db"], &mut stdout, &mut stderr);
        assert_eq!(status, exit::CONFIG);
        assert!(!stderr.is_empty());
    }

    #[tokio::test]
    async fn scenario_4_an_admin_tagged_peer_creates_an_account_over_the_wire() {
        let store = Arc::new(SqliteAccountStore::open_in_memory().unwrap());
        let daemon = Arc::new(DbDaemon::new(store));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let conn = Connection::new(stream, cipher_pair(), DB_ROLE_TAG);
            daemon.handle_peer(conn).await
        });

        let client_stream = TcpStream::connect(addr).await.unwrap();
        let mut client = Connection::new(client_stream, cipher_pair(), ACCT_CREATE_REPLY);
        client
            .write_message(DB_ROLE_TAG, &[FieldValue::Int(DB_ROLE_ADMIN)])
            .await
            .unwrap();
        client
            .write_message(
                ACCT_CREATE_REQUEST,
                &[
                    FieldValue::Transaction(1),
                    FieldValue::Str("alice".to_string()),
                    FieldValue::Str("pw".to_string()),
                    FieldValue::Int(u64::from(AccountFlags::USER.bits())),
                ],
            )
            .await
            .unwrap();
        let reply = client.read_message().await.unwrap();
        assert_eq!(reply[0], FieldValue::Transaction(1));
        assert_eq!(reply[1], FieldValue::Int(0));
        assert!(matches!(reply[2], FieldValue::Uuid(_)));

        drop(client);
        let _ = server.await.unwrap();
    }

    #[tokio::test]
    async fn scenario_4_an_auth_tagged_peer_authenticates_the_created_account() {
        let store = Arc::new(SqliteAccountStore::open_in_memory().unwrap());
        let uuid = store.create("alice", "pw", AccountFlags::USER).await.unwrap();
        let daemon = Arc::new(DbDaemon::new(store));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let conn = Connection::new(stream, cipher_pair(), DB_ROLE_TAG);
            daemon.handle_peer(conn).await
        });

        let client_stream = TcpStream::connect(addr).await.unwrap();
        let mut client = Connection::new(client_stream, cipher_pair(), ACCT_AUTH_REPLY);
        client
            .write_message(DB_ROLE_TAG, &[FieldValue::Int(DB_ROLE_AUTH)])
            .await
            .unwrap();

        let stored_hash = acct_hash("alice", "pw", HashAlgorithm::Sha1);
        let client_hash = login_hash(&stored_hash, 0xAAAA, 0xBBBB);
        client
            .write_message(
                ACCT_AUTH_REQUEST,
                &[
                    FieldValue::Transaction(9),
                    FieldValue::Str("alice".to_string()),
                    FieldValue::Blob(client_hash.to_vec()),
                    FieldValue::Int(0xAAAA),
                    FieldValue::Int(0xBBBB),
                ],
            )
            .await
            .unwrap();
        let reply = client.read_message().await.unwrap();
        assert_eq!(reply[0], FieldValue::Transaction(9));
        assert_eq!(reply[1], FieldValue::Int(0));
        assert_eq!(reply[2], FieldValue::Uuid(uuid_to_wire(uuid)));

        drop(client);
        let _ = server.await.unwrap();
    }

    #[test]
    fn parse_create_request_rejects_a_truncated_message() {
        assert!(parse_create_request(&[FieldValue::Transaction(1)]).is_none());
    }

    #[test]
    fn parse_auth_request_rejects_a_truncated_message() {
        assert!(parse_auth_request(&[FieldValue::Transaction(1)]).is_none());
    }

    #[test]
    fn net_error_for_maps_every_account_error_variant() {
        assert_eq!(net_error_for(&AccountError::AlreadyExists), NetError::AccountAlreadyExists);
        assert_eq!(net_error_for(&AccountError::NotFound), NetError::AccountNotFound);
        assert_eq!(
            net_error_for(&AccountError::AuthenticationFailed),
            NetError::AuthenticationFailed
        );
        assert_eq!(net_error_for(&AccountError::Banned), NetError::AccountBanned);
    }
}
