//! Connection registry: tracks the single live WebSocket connection per user.

use dashmap::DashMap;

use super::ConnectionSender;
use crate::ids::{ConnectionId, UserId};

/// A user's live connection: its identity plus the outbound channel.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub conn_id: ConnectionId,
    pub sender: ConnectionSender,
}

/// One live connection per user, last writer wins. A reconnect overwrites
/// the previous entry; the superseded connection's own disconnect is then a
/// guarded no-op, so a late-arriving stale disconnect never evicts the live
/// entry.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<UserId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the user's connection. Returns whether an older
    /// connection was displaced.
    pub fn register(&self, user_id: &UserId, handle: ConnectionHandle) -> bool {
        self.connections.insert(user_id.clone(), handle).is_some()
    }

    /// Remove the mapping only if it still points at `conn_id`. Returns
    /// whether an entry was actually removed.
    pub fn unregister(&self, user_id: &UserId, conn_id: &ConnectionId) -> bool {
        self.connections
            .remove_if(user_id, |_, handle| handle.conn_id == *conn_id)
            .is_some()
    }

    /// The user's live connection, or `None` when offline.
    pub fn lookup(&self, user_id: &UserId) -> Option<ConnectionHandle> {
        self.connections.get(user_id).map(|entry| entry.value().clone())
    }

    /// All currently online users.
    pub fn snapshot(&self) -> Vec<UserId> {
        self.connections.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Outbound channels of every live connection, for broadcasts.
    pub fn senders(&self) -> Vec<ConnectionSender> {
        self.connections
            .iter()
            .map(|entry| entry.value().sender.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle(conn: &str) -> ConnectionHandle {
        let (tx, _rx) = mpsc::unbounded_channel();
        ConnectionHandle {
            conn_id: ConnectionId::from(conn),
            sender: tx,
        }
    }

    #[test]
    fn register_overwrites_previous_connection() {
        let registry = ConnectionRegistry::new();
        let alice = UserId::from("alice");

        assert!(!registry.register(&alice, handle("c1")));
        assert!(registry.register(&alice, handle("c2")));

        let live = registry.lookup(&alice).unwrap();
        assert_eq!(live.conn_id, ConnectionId::from("c2"));
    }

    #[test]
    fn stale_unregister_does_not_evict_live_connection() {
        let registry = ConnectionRegistry::new();
        let alice = UserId::from("alice");

        registry.register(&alice, handle("c1"));
        registry.register(&alice, handle("c2"));

        // c1's disconnect arrives after c2 took over
        assert!(!registry.unregister(&alice, &ConnectionId::from("c1")));
        assert!(registry.lookup(&alice).is_some());

        assert!(registry.unregister(&alice, &ConnectionId::from("c2")));
        assert!(registry.lookup(&alice).is_none());
    }

    #[test]
    fn unregister_unknown_user_is_a_noop() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.unregister(&UserId::from("ghost"), &ConnectionId::from("c1")));
    }

    #[test]
    fn snapshot_lists_online_users() {
        let registry = ConnectionRegistry::new();
        registry.register(&UserId::from("a"), handle("c1"));
        registry.register(&UserId::from("b"), handle("c2"));

        let mut online = registry.snapshot();
        online.sort();
        assert_eq!(online, vec![UserId::from("a"), UserId::from("b")]);

        registry.unregister(&UserId::from("a"), &ConnectionId::from("c1"));
        assert_eq!(registry.snapshot(), vec![UserId::from("b")]);
    }
}
