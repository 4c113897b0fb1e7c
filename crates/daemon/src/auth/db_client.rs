//! The auth daemon's internal db client: forwards a login attempt to
//! the db daemon as `acctAuthRequest` and reports its verdict back,
//! reusing the same actor/router/reconnect-timer composition as the
//! admin daemon's own db client.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::warn;
use uuid::Uuid;

use net::{ConnError, Connection};
use net_error::NetError;
use router::{ReconnectTimer, TransactionRouter};
use wire::FieldValue;

use crate::protocol::{uuid_from_wire, ACCT_AUTH_REPLY, ACCT_AUTH_REQUEST};

/// The outcome of a successful login verdict from the db daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthVerdict {
    pub uuid: Uuid,
    pub flags: u32,
}

enum Command {
    Authenticate {
        name: String,
        cli_challenge: u32,
        srv_challenge: u32,
        client_hash: [u8; 20],
        reply: oneshot::Sender<Result<AuthVerdict, NetError>>,
    },
}

/// A cheaply cloneable handle an auth-daemon login handler holds to
/// forward a login attempt to the db daemon.
#[derive(Clone)]
pub struct AuthDbClientHandle {
    commands: mpsc::Sender<Command>,
}

impl AuthDbClientHandle {
    /// Forwards `acctAuthRequest(name, clientHash, cliChallenge,
    /// srvChallenge)` to the db daemon and waits for its verdict.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Disconnected`] if the underlying connection
    /// drops before a reply arrives, or the db daemon's own reported
    /// error code otherwise (e.g. [`NetError::AuthenticationFailed`]).
    pub async fn authenticate(
        &self,
        name: String,
        cli_challenge: u32,
        srv_challenge: u32,
        client_hash: [u8; 20],
    ) -> Result<AuthVerdict, NetError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Authenticate {
                name,
                cli_challenge,
                srv_challenge,
                client_hash,
                reply,
            })
            .await
            .map_err(|_| NetError::Disconnected)?;
        rx.await.unwrap_or(Err(NetError::Disconnected))
    }
}

/// Spawns the db-client actor. `connect` is retried with
/// [`ReconnectTimer`]'s default back-off whenever the active connection
/// is lost.
pub fn spawn<C, Fut>(connect: C) -> AuthDbClientHandle
where
    C: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Connection, ConnError>> + Send,
{
    let (commands, receiver) = mpsc::channel(64);
    tokio::spawn(run_actor(connect, receiver));
    AuthDbClientHandle { commands }
}

async fn run_actor<C, Fut>(mut connect: C, mut commands: mpsc::Receiver<Command>)
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<Connection, ConnError>>,
{
    let mut router: TransactionRouter<()> = TransactionRouter::new();
    let wrap_id = AtomicU32::new(0);
    let reconnect = ReconnectTimer::new();
    let mut conn = connect().await.ok();

    loop {
        let Some(active) = conn.as_mut() else {
            conn = Some(reconnect.run(&mut connect).await);
            continue;
        };

        tokio::select! {
            command = commands.recv() => {
                match command {
                    None => return,
                    Some(Command::Authenticate { name, cli_challenge, srv_challenge, client_hash, reply }) => {
                        let wid = wrap_id.fetch_add(1, Ordering::Relaxed);
                        let id = router.gen_trans(
                            (),
                            wid,
                            Box::new(move |_, error, payload| {
                                let outcome = if error.is_success() {
                                    payload
                                        .and_then(|values| extract_verdict(&values))
                                        .ok_or(NetError::BadServerData)
                                } else {
                                    Err(error)
                                };
                                let _ = reply.send(outcome);
                            }),
                        );
                        let values = vec![
                            FieldValue::Transaction(id),
                            FieldValue::Str(name),
                            FieldValue::Blob(client_hash.to_vec()),
                            FieldValue::Int(u64::from(cli_challenge)),
                            FieldValue::Int(u64::from(srv_challenge)),
                        ];
                        if active.write_message(ACCT_AUTH_REQUEST, &values).await.is_err() {
                            conn = None;
                            router.kill_trans(NetError::Disconnected, false);
                        }
                    }
                }
            }
            incoming = active.read_message() => {
                match incoming {
                    Ok(values) => handle_reply(&mut router, values),
                    Err(_) => {
                        conn = None;
                        router.kill_trans(NetError::Disconnected, false);
                    }
                }
            }
        }
    }
}

fn extract_verdict(values: &[FieldValue]) -> Option<AuthVerdict> {
    let uuid = values.iter().find_map(|v| match v {
        FieldValue::Uuid(bytes) => Some(uuid_from_wire(*bytes)),
        _ => None,
    })?;
    let flags = values.iter().rev().find_map(|v| match v {
        FieldValue::Int(code) => u32::try_from(*code).ok(),
        _ => None,
    })?;
    Some(AuthVerdict { uuid, flags })
}

fn handle_reply(router: &mut TransactionRouter<()>, values: Vec<FieldValue>) {
    let Some(FieldValue::Transaction(id)) = values.first().cloned() else {
        warn!("acctAuthRequest reply is missing its transaction id field");
        return;
    };
    let error = values
        .get(1)
        .and_then(|v| match v {
            FieldValue::Int(code) => u32::try_from(*code).ok(),
            _ => None,
        })
        .map(NetError::from_wire)
        .unwrap_or(NetError::BadServerData);
    router.fire_trans(id, error, Some(values));
}
