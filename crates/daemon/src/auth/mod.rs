//! The auth daemon: issues the per-connection `srvChallenge`, verifies
//! a client's login hash against the db daemon, and reports the
//! verdict back as `acctLoginReply`.

pub mod db_client;

use std::ffi::OsString;
use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use rand::RngCore;
use uuid::Uuid;

use net::{ConnError, Connection};
use net_error::NetError;
use wire::FieldValue;

use crate::cli::{exit, handle_parse_error};
use crate::console::{self, ConsoleCommand};
use crate::error::DaemonError;
use crate::protocol::{ACCT_LOGIN_REPLY, AUTH_CHALLENGE};
use db_client::AuthDbClientHandle;

/// Shared state one auth-daemon process holds across every connected
/// client.
pub struct AuthDaemon {
    db: AuthDbClientHandle,
}

impl AuthDaemon {
    /// Builds the daemon state around an already-spawned db client.
    #[must_use]
    pub fn new(db: AuthDbClientHandle) -> Self {
        Self { db }
    }

    /// Runs one client connection's login attempt: writes the freshly
    /// drawn `srvChallenge`, reads exactly one `acctLoginRequest`,
    /// forwards it to the db daemon, and replies with its verdict.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError`] if the socket fails; the caller should
    /// drop the connection regardless of the result.
    pub async fn handle_client(&self, mut conn: Connection) -> Result<(), ConnError> {
        let srv_challenge = rand::thread_rng().next_u32();
        conn.write_message(AUTH_CHALLENGE, &[FieldValue::Int(u64::from(srv_challenge))])
            .await?;

        let values = conn.read_message().await?;
        let Some(request) = parse_login_request(&values) else {
            return conn
                .write_message(
                    ACCT_LOGIN_REPLY,
                    &error_reply(0, NetError::BadServerData),
                )
                .await;
        };

        let verdict = self
            .db
            .authenticate(request.name, request.cli_challenge, srv_challenge, request.hash)
            .await;

        let reply = match verdict {
            Ok(verdict) => vec![
                FieldValue::Transaction(request.trans_id),
                FieldValue::Int(NetError::Success.to_wire().into()),
                FieldValue::Uuid(crate::protocol::uuid_to_wire(verdict.uuid)),
                FieldValue::Int(u64::from(verdict.flags)),
            ],
            Err(error) => error_reply(request.trans_id, error),
        };
        conn.write_message(ACCT_LOGIN_REPLY, &reply).await
    }
}

struct LoginRequest {
    trans_id: u32,
    cli_challenge: u32,
    name: String,
    hash: [u8; 20],
}

fn parse_login_request(values: &[FieldValue]) -> Option<LoginRequest> {
    let trans_id = values.first()?.as_transaction()?;
    let cli_challenge = match values.get(1)? {
        FieldValue::Int(v) => u32::try_from(*v).ok()?,
        _ => return None,
    };
    let name = match values.get(2)? {
        FieldValue::Str(s) => s.clone(),
        _ => return None,
    };
    let hash = match values.get(3)? {
        FieldValue::Blob(bytes) if bytes.len() == 20 => {
            let mut out = [0u8; 20];
            out.copy_from_slice(bytes);
            out
        }
        _ => return None,
    };
    Some(LoginRequest {
        trans_id,
        cli_challenge,
        name,
        hash,
    })
}

fn error_reply(trans_id: u32, error: NetError) -> Vec<FieldValue> {
    vec![
        FieldValue::Transaction(trans_id),
        FieldValue::Int(error.to_wire().into()),
        FieldValue::Uuid([0u8; 16]),
        FieldValue::Int(0),
    ]
}

#[derive(Parser, Debug)]
#[command(name = "shard-auth", version, about = "Auth daemon: client login and session authentication")]
struct Args {
    /// Path to the ini-style configuration file.
    #[arg(long)]
    config: String,
}

/// The auth daemon's CLI entry point.
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
            let mut conn = Connection::new(stream, cipher, crate::protocol::ACCT_AUTH_REPLY);
            conn.write_message(
                crate::protocol::DB_ROLE_TAG,
                &[wire::FieldValue::Int(crate::protocol::DB_ROLE_AUTH)],
            )
            .await?;
            Ok(conn)
        }
    });

    let own_role_keys = shard_config.crypt_keys("auth")?;
    let own_key_set = crypt::KeySet::from_base64(
        &own_role_keys.k_base64,
        &own_role_keys.n_base64,
        &own_role_keys.x_base64,
    )?;
    let responder_params = Arc::new(crypt::ResponderParams {
        k: own_key_set.k,
        n: own_key_set.n,
    });

    let daemon = Arc::new(AuthDaemon::new(db_handle));
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
    lobby.route(net::ConnType::Cli2Auth, tx);

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
                            "auth daemon: {} connection(s) in flight, uptime {:?}",
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
                    let conn = Connection::new(stream, cipher, crate::protocol::ACCT_LOGIN_REQUEST);
                    let _ = daemon.handle_client(conn).await;
                });
            }
            _ = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    lobby_task.abort();
    connections.shutdown().await;
    Ok(())
}
