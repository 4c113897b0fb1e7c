//! The client-side transaction router (component G): per-connection
//! monotonic transaction ids mapped to continuations, fired in reply
//! order rather than issue order.

use std::collections::HashMap;

use tracing::warn;

use net_error::NetError;
use wire::FieldValue;

use crate::error::RouterError;

/// The continuation a caller hands to [`TransactionRouter::gen_trans`].
/// Invoked exactly once, either by [`TransactionRouter::fire_trans`] on
/// a matching reply or by a kill operation on teardown/disconnect.
pub type Continuation = Box<dyn FnOnce(u32, NetError, Option<Vec<FieldValue>>) + Send>;

struct Pending<Inst> {
    instance: Inst,
    wrap_id: u32,
    callback: Continuation,
}

/// Routes replies back to the continuation that issued the matching
/// request, for one connection's worth of in-flight transactions.
///
/// `Inst` tags which logical subsystem issued a transaction, so that a
/// router nested inside another component (the admin daemon acting as a
/// db client, say) can kill only its own records without disturbing
/// unrelated ones sharing the same connection.
pub struct TransactionRouter<Inst> {
    next_id: u32,
    pending: HashMap<u32, Pending<Inst>>,
}

impl<Inst> Default for TransactionRouter<Inst> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Inst: Copy + PartialEq> TransactionRouter<Inst> {
    /// Creates a router with no pending transactions and a fresh id
    /// counter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: HashMap::new(),
        }
    }

    /// Returns a fresh, non-zero, monotonically increasing transaction
    /// id, wrapping past `u32::MAX` by skipping zero.
    pub fn next_trans_id(&mut self) -> u32 {
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            if self.next_id != 0 {
                return self.next_id;
            }
        }
    }

    /// Allocates a fresh id, records `callback` under it tagged with
    /// `instance` and `wrap_id`, and returns the id for the caller to
    /// place in its outgoing request's transaction field.
    pub fn gen_trans(&mut self, instance: Inst, wrap_id: u32, callback: Continuation) -> u32 {
        let id = self.next_trans_id();
        self.pending.insert(
            id,
            Pending {
                instance,
                wrap_id,
                callback,
            },
        );
        id
    }

    /// Number of currently outstanding transactions.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Looks up `id`, removes its record, and invokes the continuation
    /// with `error` and `payload`. Logs and does nothing if `id` is
    /// unknown (already fired, killed, or never issued).
    pub fn fire_trans(&mut self, id: u32, error: NetError, payload: Option<Vec<FieldValue>>) {
        match self.pending.remove(&id) {
            Some(pending) => (pending.callback)(pending.wrap_id, error, payload),
            None => warn!(
                error = %RouterError::UnknownTransaction(id),
                "fire_trans on an unknown transaction id"
            ),
        }
    }

    /// Removes every pending record for this router's connection,
    /// invoking each continuation with `error` unless `quiet` is set (in
    /// which case continuations are dropped silently — used at
    /// teardown, where they are no longer valid to invoke).
    pub fn kill_trans(&mut self, error: NetError, quiet: bool) {
        let ids: Vec<u32> = self.pending.keys().copied().collect();
        for id in ids {
            if let Some(pending) = self.pending.remove(&id) {
                if !quiet {
                    (pending.callback)(pending.wrap_id, error, None);
                }
            }
        }
    }

    /// Like [`Self::kill_trans`] but restricted to records tagged with
    /// `instance`.
    pub fn kill_trans_for_instance(&mut self, instance: Inst, error: NetError, quiet: bool) {
        let ids: Vec<u32> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.instance == instance)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            if let Some(pending) = self.pending.remove(&id) {
                if !quiet {
                    (pending.callback)(pending.wrap_id, error, None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn next_trans_id_never_returns_zero_or_repeats() {
        let mut router: TransactionRouter<()> = TransactionRouter::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10 {
            let id = router.next_trans_id();
            assert_ne!(id, 0);
            assert!(seen.insert(id), "id {id} repeated");
        }
    }

    #[test]
    fn next_trans_id_skips_zero_on_wraparound() {
        let mut router: TransactionRouter<()> = TransactionRouter::new();
        router.next_id = u32::MAX;
        assert_eq!(router.next_trans_id(), 1);
    }

    #[test]
    fn fire_trans_invokes_the_matching_continuation_exactly_once() {
        let mut router: TransactionRouter<()> = TransactionRouter::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        let id = router.gen_trans(
            (),
            7,
            Box::new(move |wrap_id, error, payload| {
                *seen_clone.lock().unwrap() = Some((wrap_id, error, payload));
            }),
        );
        assert_eq!(router.pending_count(), 1);
        router.fire_trans(id, NetError::Success, Some(vec![FieldValue::Int(1)]));
        assert_eq!(router.pending_count(), 0);
        let (wrap_id, error, payload) = seen.lock().unwrap().take().unwrap();
        assert_eq!(wrap_id, 7);
        assert_eq!(error, NetError::Success);
        assert_eq!(payload, Some(vec![FieldValue::Int(1)]));
    }

    #[test]
    fn fire_trans_on_unknown_id_is_a_harmless_no_op() {
        let mut router: TransactionRouter<()> = TransactionRouter::new();
        router.fire_trans(999, NetError::NotSupported, None);
    }

    #[test]
    fn kill_trans_invokes_every_pending_continuation_with_the_given_error() {
        let mut router: TransactionRouter<()> = TransactionRouter::new();
        let count = Arc::new(Mutex::new(0u32));
        for _ in 0..3 {
            let count = count.clone();
            router.gen_trans(
                (),
                0,
                Box::new(move |_, error, _| {
                    assert_eq!(error, NetError::Disconnected);
                    *count.lock().unwrap() += 1;
                }),
            );
        }
        router.kill_trans(NetError::Disconnected, false);
        assert_eq!(*count.lock().unwrap(), 3);
        assert_eq!(router.pending_count(), 0);
    }

    #[test]
    fn quiet_kill_drops_continuations_without_invoking_them() {
        let mut router: TransactionRouter<()> = TransactionRouter::new();
        router.gen_trans(
            (),
            0,
            Box::new(|_, _, _| panic!("continuation must not run when quiet")),
        );
        router.kill_trans(NetError::Disconnected, true);
        assert_eq!(router.pending_count(), 0);
    }

    #[test]
    fn kill_trans_for_instance_only_touches_matching_records() {
        let mut router: TransactionRouter<u8> = TransactionRouter::new();
        let hit = Arc::new(Mutex::new(0u32));
        let hit_a = hit.clone();
        router.gen_trans(1, 0, Box::new(move |_, _, _| *hit_a.lock().unwrap() += 1));
        let survives = Arc::new(Mutex::new(false));
        let survives_clone = survives.clone();
        let id_b = router.gen_trans(
            2,
            0,
            Box::new(move |_, _, _| *survives_clone.lock().unwrap() = true),
        );
        router.kill_trans_for_instance(1, NetError::Disconnected, false);
        assert_eq!(*hit.lock().unwrap(), 1);
        assert_eq!(router.pending_count(), 1);
        router.fire_trans(id_b, NetError::Success, None);
        assert!(*survives.lock().unwrap());
    }
}
