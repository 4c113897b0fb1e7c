//! The admin daemon: accepts admin clients, offers the `wall` broadcast
//! and the `acctCreate` proxy forwarded to the db daemon over its own
//! internal db client (component I, newer db-client-backed layout per
//! the design ledger's second open-question decision).

pub mod db_client;
pub mod wall;

use std::ffi::OsString;
use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;
use uuid::Uuid;

use net::{ConnError, Connection};
use net_error::NetError;
use wire::{FieldValue, WireError};

use crate::cli::{exit, handle_parse_error};
use crate::console::{self, ConsoleCommand};
use crate::error::DaemonError;
use crate::protocol::{
    uuid_to_wire, CLI_ACCT_CREATE_REPLY, CLI_ACCT_CREATE_REQUEST, CLI_ADMIN_REQUEST_TAG,
    CLI_ADMIN_TAG_ACCT_CREATE, CLI_ADMIN_TAG_WALL, WALL_BCAST, WALL_REQUEST,
};
use db_client::DbClientHandle;
use wall::WallHub;

/// Shared state one admin-daemon process holds across every connected
/// client.
pub struct AdminDaemon {
    wall: Arc<Mutex<WallHub>>,
    db: DbClientHandle,
}

impl AdminDaemon {
    /// Builds the daemon state around an already-spawned db client.
    #[must_use]
    pub fn new(db: DbClientHandle) -> Self {
        Self {
            wall: Arc::new(Mutex::new(WallHub::new())),
            db,
        }
    }

    /// Proxies `acctCreate` to the db daemon on behalf of an admin
    /// client or the operator console.
    ///
    /// # Errors
    ///
    /// Returns whatever [`NetError`] the db daemon reports, or
    /// [`NetError::Disconnected`] if the db connection is down and has
    /// not yet reconnected.
    pub async fn acct_create(&self, name: String, password: String, flags: u32) -> Result<Uuid, NetError> {
        self.db.acct_create(name, password, flags).await
    }

    /// Runs one authenticated admin client's message loop until it
    /// disconnects: dispatches each incoming request by its leading
    /// [`CLI_ADMIN_REQUEST_TAG`] to either the `wall` broadcast or the
    /// `acctCreate` proxy, and relays broadcasts from other clients back
    /// out over the socket.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError`] if the socket fails or a client sends an
    /// unrecognized request tag; the caller should drop the connection
    /// regardless of the result.
    pub async fn handle_client(&self, mut conn: Connection, name: String) -> Result<(), ConnError> {
        let (id, mut events) = self.wall.lock().await.register(name);
        conn.rebind(CLI_ADMIN_REQUEST_TAG);
        let result = loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break Ok(()) };
                    let values = vec![FieldValue::Str(event.from), FieldValue::Str(event.message)];
                    if let Err(err) = conn.write_message(WALL_BCAST, &values).await {
                        break Err(err);
                    }
                }
                tag = conn.read_message() => {
                    let tag_values = match tag {
                        Ok(values) => values,
                        Err(err) => break Err(err),
                    };
                    match tag_values.first() {
                        Some(FieldValue::Int(t)) if *t == CLI_ADMIN_TAG_WALL => {
                            conn.rebind(WALL_REQUEST);
                            let body = match conn.read_message().await {
                                Ok(body) => body,
                                Err(err) => break Err(err),
                            };
                            if let Some(message) = wall_request_message(&body) {
                                self.wall.lock().await.broadcast(id, &message);
                            }
                            conn.rebind(CLI_ADMIN_REQUEST_TAG);
                        }
                        Some(FieldValue::Int(t)) if *t == CLI_ADMIN_TAG_ACCT_CREATE => {
                            conn.rebind(CLI_ACCT_CREATE_REQUEST);
                            let body = match conn.read_message().await {
                                Ok(body) => body,
                                Err(err) => break Err(err),
                            };
                            if let Err(err) = self.handle_cli_acct_create(&mut conn, &body).await {
                                break Err(err);
                            }
                            conn.rebind(CLI_ADMIN_REQUEST_TAG);
                        }
                        _ => break Err(ConnError::Wire(WireError::ValueMismatch)),
                    }
                }
            }
        };
        self.wall.lock().await.unregister(id);
        result
    }

    async fn handle_cli_acct_create(&self, conn: &mut Connection, values: &[FieldValue]) -> Result<(), ConnError> {
        let Some(request) = parse_cli_acct_create_request(values) else {
            return Err(ConnError::Wire(WireError::ValueMismatch));
        };
        let reply = match self.acct_create(request.name, request.password, request.flags).await {
            Ok(uuid) => vec![
                FieldValue::Transaction(request.trans_id),
                FieldValue::Int(NetError::Success.to_wire().into()),
                FieldValue::Uuid(uuid_to_wire(uuid)),
            ],
            Err(error) => vec![
                FieldValue::Transaction(request.trans_id),
                FieldValue::Int(error.to_wire().into()),
                FieldValue::Uuid([0u8; 16]),
            ],
        };
        conn.write_message(CLI_ACCT_CREATE_REPLY, &reply).await
    }
}

fn wall_request_message(values: &[FieldValue]) -> Option<String> {
    match values.get(1) {
        Some(FieldValue::Str(message)) => Some(message.clone()),
        _ => None,
    }
}

struct CliAcctCreateRequest {
    trans_id: u32,
    name: String,
    password: String,
    flags: u32,
}

fn parse_cli_acct_create_request(values: &[FieldValue]) -> Option<CliAcctCreateRequest> {
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
        FieldValue::Int(v) => u32::try_from(*v).ok()?,
        _ => return None,
    };
    Some(CliAcctCreateRequest {
        trans_id,
        name,
        password,
        flags,
    })
}

#[derive(Parser, Debug)]
#[command(name = "shard-admin", version, about = "Admin daemon: wall broadcast and acctCreate proxy")]
struct Args {
    /// Path to the ini-style configuration file.
    #[arg(long)]
    config: String,
}

/// The admin daemon's CLI entry point. Parses arguments, loads
/// configuration, starts logging, and runs the event loop until a
/// fatal error or the console's `quit` command.
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
    let _guard = logging::init(&shard_config.log.directory, shard_config.log.level)
        .map_err(DaemonError::Logging)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(DaemonError::Logging)?;
    runtime.block_on(serve(shard_config))
}

async fn serve(shard_config: config::ShardConfig) -> Result<(), DaemonError> {
    let Some(db_peer) = shard_config.db.clone() else {
        return Err(DaemonError::Config(config::ConfigError::MissingKey {
            section: "db".to_string(),
            key: "addr".to_string(),
        }));
    };

    let db_role_keys = shard_config.crypt_keys("db")?;
    let db_key_set = crypt::KeySet::from_base64(
        &db_role_keys.k_base64,
        &db_role_keys.n_base64,
        &db_role_keys.x_base64,
    )?;
    let db_initiator = crypt::InitiatorParams {
        g: db_role_keys.generator,
        n: db_key_set.n,
        x: db_key_set.x,
    };

    let db_handle = db_client::spawn(move || {
        let db_peer = db_peer.clone();
        let g = db_initiator.g;
        let n = db_initiator.n.clone();
        let x = db_initiator.x.clone();
        async move {
            let addr = format!("{}:{}", db_peer.addr, db_peer.port);
            let mut stream = tokio::net::TcpStream::connect(&addr).await.map_err(ConnError::Io)?;
            let client_seed = crypt::random_client_seed(&n);
            let params = crypt::InitiatorParams { g, n, x };
            let cipher = crypt::initiate(&mut stream, &params, &client_seed)
                .await
                .map_err(|_| ConnError::VerificationFailed)?;
            let mut conn = Connection::new(stream, cipher, crate::protocol::ACCT_CREATE_REPLY);
            conn.write_message(
                crate::protocol::DB_ROLE_TAG,
                &[wire::FieldValue::Int(crate::protocol::DB_ROLE_ADMIN)],
            )
            .await?;
            Ok(conn)
        }
    });

    let own_role_keys = shard_config.crypt_keys("admin")?;
    let own_key_set = crypt::KeySet::from_base64(
        &own_role_keys.k_base64,
        &own_role_keys.n_base64,
        &own_role_keys.x_base64,
    )?;
    let responder_params = Arc::new(crypt::ResponderParams {
        k: own_key_set.k,
        n: own_key_set.n,
    });

    let daemon = Arc::new(AdminDaemon::new(db_handle));
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
    lobby.route(net::ConnType::Cli2Admin, tx);

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
                        let clients = daemon.wall.lock().await.client_count();
                        println!(
                            "admin daemon: {clients} connected client(s), uptime {:?}",
                            started.elapsed()
                        );
                    }
                    Some(ConsoleCommand::Wall(message)) => {
                        daemon.wall.lock().await.broadcast_from_console(&message);
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
                    let name = format!("client-{}", accepted.connect_data.build_id);
                    let conn = Connection::new(stream, cipher, CLI_ADMIN_REQUEST_TAG);
                    let _ = daemon.handle_client(conn, name).await;
                });
            }
            _ = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    // Two-phase shutdown: stop the acceptor (no more new connections),
    // then tear down every connection task still in flight.
    lobby_task.abort();
    connections.shutdown().await;
    Ok(())
}

use crate::logging;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_flag_reports_success_and_writes_to_stdout() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(["shard-admin", "--version"], &mut stdout, &mut stderr);
        assert_eq!(status, exit::OK);
        assert!(!stdout.is_empty());
        assert!(stderr.is_empty());
    }

    #[test]
    fn missing_config_flag_is_a_usage_error() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(["shard-admin"], &mut stdout, &mut stderr);
        assert_eq!(status, exit::CONFIG);
        assert!(!stderr.is_empty());
    }

    mod client_dispatch {
        use crypt::{CipherPair, Rc4};
        use tokio::net::{TcpListener, TcpStream};

        use super::*;
        use crate::protocol::{uuid_to_wire, ACCT_CREATE_REPLY, ACCT_CREATE_REQUEST};

        const KEY: &[u8; 7] = b"\x01\x02\x03\x04\x05\x06\x07";

        fn cipher_pair() -> CipherPair {
            CipherPair {
                encrypt: Rc4::new(KEY),
                decrypt: Rc4::new(KEY),
            }
        }

        /// Stands in for the db daemon: accepts one connection, replies
        /// to exactly one `acctCreate`, and hands the generated uuid
        /// back to the test.
        async fn fake_db_daemon(listener: TcpListener) -> Uuid {
            let (stream, _) = listener.accept().await.unwrap();
            let mut conn = Connection::new(stream, cipher_pair(), ACCT_CREATE_REQUEST);
            let values = conn.read_message().await.unwrap();
            let Some(FieldValue::Transaction(id)) = values.first().cloned() else {
                panic!("expected a transaction id");
            };
            let uuid = Uuid::new_v4();
            conn.write_message(
                ACCT_CREATE_REPLY,
                &[
                    FieldValue::Transaction(id),
                    FieldValue::Int(0),
                    FieldValue::Uuid(uuid_to_wire(uuid)),
                ],
            )
            .await
            .unwrap();
            uuid
        }

        #[tokio::test]
        async fn a_single_client_connection_speaks_both_wall_and_acct_create() {
            let db_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let db_addr = db_listener.local_addr().unwrap();
            let db_server = tokio::spawn(fake_db_daemon(db_listener));

            let db_handle = db_client::spawn(move || async move {
                let stream = TcpStream::connect(db_addr).await.map_err(ConnError::Io)?;
                Ok(Connection::new(stream, cipher_pair(), ACCT_CREATE_REPLY))
            });
            let daemon = Arc::new(AdminDaemon::new(db_handle));

            let client_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let client_addr = client_listener.local_addr().unwrap();
            let server_daemon = daemon.clone();
            let server = tokio::spawn(async move {
                let (stream, _) = client_listener.accept().await.unwrap();
                let conn = Connection::new(stream, cipher_pair(), CLI_ADMIN_REQUEST_TAG);
                server_daemon.handle_client(conn, "alice".to_string()).await
            });

            let client_stream = TcpStream::connect(client_addr).await.unwrap();
            let mut client = Connection::new(client_stream, cipher_pair(), CLI_ADMIN_REQUEST_TAG);

            client
                .write_message(CLI_ADMIN_REQUEST_TAG, &[FieldValue::Int(CLI_ADMIN_TAG_WALL)])
                .await
                .unwrap();
            client.rebind(WALL_REQUEST);
            client
                .write_message(WALL_REQUEST, &[FieldValue::Transaction(1), FieldValue::Str("hi".to_string())])
                .await
                .unwrap();

            client.rebind(CLI_ADMIN_REQUEST_TAG);
            client
                .write_message(CLI_ADMIN_REQUEST_TAG, &[FieldValue::Int(CLI_ADMIN_TAG_ACCT_CREATE)])
                .await
                .unwrap();
            client.rebind(CLI_ACCT_CREATE_REQUEST);
            client
                .write_message(
                    CLI_ACCT_CREATE_REQUEST,
                    &[
                        FieldValue::Transaction(2),
                        FieldValue::Str("bob".to_string()),
                        FieldValue::Str("hunter2".to_string()),
                        FieldValue::Int(0),
                    ],
                )
                .await
                .unwrap();

            client.rebind(CLI_ACCT_CREATE_REPLY);
            let reply = client.read_message().await.unwrap();
            let created_uuid = db_server.await.unwrap();
            assert_eq!(reply[0], FieldValue::Transaction(2));
            assert_eq!(reply[1], FieldValue::Int(0));
            assert_eq!(reply[2], FieldValue::Uuid(uuid_to_wire(created_uuid)));

            drop(client);
            let _ = server.await.unwrap();
        }
    }
}
