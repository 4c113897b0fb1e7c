//! The admin wall broadcast (end-to-end scenario 5): any authenticated
//! admin client's `wallRequest` reaches every other connected admin
//! client exactly once, and never its own sender.

use tokio::sync::mpsc;

use net::{ClientId, ClientTable};

/// A wall message as delivered to a recipient: who sent it and what it
/// said. The per-connection task that owns this receiver end is
/// responsible for encoding it as [`crate::protocol::WALL_BCAST`] and
/// writing it to its socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallEvent {
    pub from: String,
    pub message: String,
}

struct Registrant {
    name: String,
    sender: mpsc::UnboundedSender<WallEvent>,
}

/// The admin daemon's in-process registry of connected, authenticated
/// admin clients, used only to fan out `wall` broadcasts. Connection
/// teardown, login, and the db-client proxy for `acctCreate` are
/// handled elsewhere; this hub's only job is the broadcast.
#[derive(Default)]
pub struct WallHub {
    clients: ClientTable<Registrant>,
}

impl WallHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly authenticated admin client under `name`,
    /// returning its handle and the receiving end of its wall feed.
    pub fn register(&mut self, name: impl Into<String>) -> (ClientId, mpsc::UnboundedReceiver<WallEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.clients.insert(Registrant {
            name: name.into(),
            sender,
        });
        (id, receiver)
    }

    /// Drops a disconnected client from the registry.
    pub fn unregister(&mut self, id: ClientId) {
        self.clients.remove(id);
    }

    /// Broadcasts `message` from `from` to every other registered
    /// client. A stale `from` (already unregistered) broadcasts
    /// nothing. Recipients whose channel has already closed are
    /// skipped silently — their own disconnect handling will
    /// eventually call [`Self::unregister`].
    pub fn broadcast(&self, from: ClientId, message: &str) {
        let Some(sender) = self.clients.get(from) else {
            return;
        };
        let from_name = sender.name.clone();
        for (id, registrant) in self.clients.iter() {
            if id == from {
                continue;
            }
            let _ = registrant.sender.send(WallEvent {
                from: from_name.clone(),
                message: message.to_string(),
            });
        }
    }

    /// Broadcasts `message` to every registered client from the
    /// operator console rather than a connected peer -- there is no
    /// [`ClientId`] to exclude.
    pub fn broadcast_from_console(&self, message: &str) {
        for (_, registrant) in self.clients.iter() {
            let _ = registrant.sender.send(WallEvent {
                from: "console".to_string(),
                message: message.to_string(),
            });
        }
    }

    /// The number of currently registered admin clients, for the
    /// console's `status` command.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_5_wall_reaches_every_other_client_exactly_once() {
        let mut hub = WallHub::new();
        let (a, mut a_rx) = hub.register("A");
        let (_b, mut b_rx) = hub.register("B");
        let (_c, mut c_rx) = hub.register("C");

        hub.broadcast(a, "hello");

        let received_b = b_rx.try_recv().unwrap();
        assert_eq!(received_b.from, "A");
        assert_eq!(received_b.message, "hello");
        assert!(b_rx.try_recv().is_err(), "B must receive no duplicate");

        let received_c = c_rx.try_recv().unwrap();
        assert_eq!(received_c.from, "A");
        assert!(c_rx.try_recv().is_err(), "C must receive no duplicate");

        assert!(a_rx.try_recv().is_err(), "the sender must not receive its own wall message");
    }

    #[test]
    fn unregistering_removes_a_client_from_future_broadcasts() {
        let mut hub = WallHub::new();
        let (a, _a_rx) = hub.register("A");
        let (b, mut b_rx) = hub.register("B");
        hub.unregister(b);
        hub.broadcast(a, "hi");
        assert!(b_rx.try_recv().is_err());
    }

    #[test]
    fn broadcast_from_a_stale_id_is_a_no_op() {
        let mut hub = WallHub::new();
        let (a, _rx) = hub.register("A");
        hub.unregister(a);
        hub.broadcast(a, "hi");
    }

    #[test]
    fn console_broadcast_reaches_every_client_including_none_excluded() {
        let mut hub = WallHub::new();
        let (_a, mut a_rx) = hub.register("A");
        let (_b, mut b_rx) = hub.register("B");

        hub.broadcast_from_console("server going down");

        assert_eq!(a_rx.try_recv().unwrap().from, "console");
        assert_eq!(b_rx.try_recv().unwrap().message, "server going down");
        assert_eq!(hub.client_count(), 2);
    }
}
