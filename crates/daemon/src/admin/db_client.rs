//! The admin daemon's internal db client (component I): a single
//! actor task owning one connection to the db daemon and its
//! [`TransactionRouter`], composing the reconnect timer (component H)
//! so a dropped connection's in-flight requests observe `disconnected`
//! and a fresh request succeeds once the retry completes (end-to-end
//! scenario 6).

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::warn;
use uuid::Uuid;

use net::{ConnError, Connection};
use net_error::NetError;
use router::{ReconnectTimer, TransactionRouter};
use wire::FieldValue;

use crate::protocol::{uuid_from_wire, ACCT_CREATE_REPLY, ACCT_CREATE_REQUEST};

enum Command {
    AcctCreate {
        name: String,
        password: String,
        flags: u32,
        reply: oneshot::Sender<Result<Uuid, NetError>>,
    },
}

/// A cheaply cloneable handle an admin-daemon protocol handler holds to
/// issue `acctCreate` against the db daemon, transparently surviving
/// reconnects underneath.
#[derive(Clone)]
pub struct DbClientHandle {
    commands: mpsc::Sender<Command>,
}

impl DbClientHandle {
    /// Proxies `acctCreate(name, password, flags)` to the db daemon and
    /// waits for its reply.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Disconnected`] if the underlying connection
    /// drops before a reply arrives (the caller may retry; nothing here
    /// replays the request automatically), or the db daemon's own
    /// reported error code otherwise.
    pub async fn acct_create(&self, name: String, password: String, flags: u32) -> Result<Uuid, NetError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::AcctCreate {
                name,
                password,
                flags,
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
pub fn spawn<C, Fut>(connect: C) -> DbClientHandle
where
    C: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Connection, ConnError>> + Send,
{
    let (commands, receiver) = mpsc::channel(64);
    tokio::spawn(run_actor(connect, receiver));
    DbClientHandle { commands }
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
                    Some(Command::AcctCreate { name, password, flags, reply }) => {
                        let wid = wrap_id.fetch_add(1, Ordering::Relaxed);
                        let id = router.gen_trans(
                            (),
                            wid,
                            Box::new(move |_, error, payload| {
                                let outcome = if error.is_success() {
                                    payload
                                        .and_then(|values| {
                                            values.into_iter().find_map(|v| match v {
                                                FieldValue::Uuid(bytes) => Some(uuid_from_wire(bytes)),
                                                _ => None,
                                            })
                                        })
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
                            FieldValue::Str(password),
                            FieldValue::Int(u64::from(flags)),
                        ];
                        if active.write_message(ACCT_CREATE_REQUEST, &values).await.is_err() {
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

fn handle_reply(router: &mut TransactionRouter<()>, values: Vec<FieldValue>) {
    let Some(FieldValue::Transaction(id)) = values.first().cloned() else {
        warn!("acctCreate reply is missing its transaction id field");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crypt::{CipherPair, Rc4};
    use tokio::net::{TcpListener, TcpStream};

    use crate::protocol::uuid_to_wire;

    const KEY: &[u8; 7] = b"\x01\x02\x03\x04\x05\x06\x07";

    fn cipher_pair() -> CipherPair {
        CipherPair {
            encrypt: Rc4::new(KEY),
            decrypt: Rc4::new(KEY),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_6_reconnect_then_a_fresh_acct_create_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            // First connection: read the in-flight request, then drop
            // without replying -- this is the connection loss the
            // in-flight `acctCreate` must observe as `disconnected`.
            let (stream, _) = listener.accept().await.unwrap();
            let mut conn = Connection::new(stream, cipher_pair(), ACCT_CREATE_REQUEST);
            conn.read_message().await.unwrap();
            drop(conn);

            // Second connection, after the client's reconnect timer
            // fires: reply successfully to a fresh request.
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
        });

        let handle = spawn(move || async move {
            let stream = TcpStream::connect(addr).await.map_err(ConnError::Io)?;
            Ok(Connection::new(stream, cipher_pair(), ACCT_CREATE_REPLY))
        });

        let lost = handle
            .acct_create("alice".to_string(), "pw".to_string(), 0)
            .await;
        assert_eq!(lost, Err(NetError::Disconnected));

        let created = handle
            .acct_create("alice".to_string(), "pw".to_string(), 0)
            .await
            .unwrap();
        let expected = server.await.unwrap();
        assert_eq!(created, expected);
    }
}
