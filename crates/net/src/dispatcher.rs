//! The lobby dispatcher (component F): one TCP acceptor that reads the
//! ConnHeader and connect-data off every new connection, checks the
//! verification policy, then hands the still-open socket off to the
//! role it named.

use std::collections::HashMap;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::conn_header::{ConnHeader, ConnType, ConnectData};
use crate::error::ConnError;
use crate::policy::{ExpectedIdentity, VerificationPolicy};

/// A socket that has passed the ConnHeader/connect-data/policy gate and
/// is ready for its role's accept routine to run the crypt handshake.
pub struct AcceptedConnection {
    pub stream: TcpStream,
    pub connect_data: ConnectData,
}

/// Routes accepted, policy-checked connections to per-role channels.
///
/// A single-role daemon process registers only its own role; a combined
/// process (useful for tests, or an all-in-one deployment) registers
/// several.
pub struct Lobby {
    listener: TcpListener,
    policy: VerificationPolicy,
    expected: ExpectedIdentity,
    routes: HashMap<ConnType, mpsc::Sender<AcceptedConnection>>,
}

impl Lobby {
    /// Binds the acceptor and prepares an empty routing table.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::Io`] if the bind fails.
    pub async fn bind(
        addr: &str,
        policy: VerificationPolicy,
        expected: ExpectedIdentity,
    ) -> Result<Self, ConnError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            policy,
            expected,
            routes: HashMap::new(),
        })
    }

    /// Registers `sender` as the destination for connections announcing
    /// `conn_type`.
    pub fn route(&mut self, conn_type: ConnType, sender: mpsc::Sender<AcceptedConnection>) {
        self.routes.insert(conn_type, sender);
    }

    /// Accepts connections forever, dispatching each one. Never
    /// returns except on an accept-level I/O error; per-connection
    /// errors are logged and the connection is dropped, the acceptor
    /// keeps running.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::Io`] if the listener itself fails.
    pub async fn run(&mut self) -> Result<(), ConnError> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            match self.accept_one(stream).await {
                Ok(()) => {}
                Err(err) => warn!(%peer, error = %err, "rejected connection at lobby"),
            }
        }
    }

    async fn accept_one(&mut self, mut stream: TcpStream) -> Result<(), ConnError> {
        let header = ConnHeader::read(&mut stream).await?;
        let mut blob = vec![0u8; header.remaining_len()];
        stream.read_exact(&mut blob).await?;
        let connect_data = ConnectData::parse(&blob)?;

        if !self
            .policy
            .check(header.conn_type, &connect_data, &self.expected)
        {
            return Err(ConnError::VerificationFailed);
        }

        let Some(sender) = self.routes.get(&header.conn_type) else {
            return Err(ConnError::NoHandler(header.conn_type));
        };
        info!(conn_type = ?header.conn_type, "dispatching accepted connection");
        sender
            .send(AcceptedConnection {
                stream,
                connect_data,
            })
            .await
            .map_err(|_| ConnError::NoHandler(header.conn_type))?;
        Ok(())
    }
}
