//! Room membership tracking for group fan-out.
//!
//! Membership is per connection, not per user: a connection explicitly joins
//! and leaves rooms, and everything it joined is dropped on disconnect. Both
//! maps shard-lock independently; no operation holds a guard on one map while
//! locking the other.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};

use crate::ids::{ConnectionId, GroupId};
use crate::ws::ConnectionSender;

#[derive(Default)]
pub struct RoomTracker {
    /// room -> member connections with their outbound channels
    rooms: DashMap<GroupId, HashMap<ConnectionId, ConnectionSender>>,
    /// connection -> rooms it joined, consulted on disconnect
    memberships: DashMap<ConnectionId, HashSet<GroupId>>,
}

impl RoomTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Idempotent.
    pub fn join(&self, room_id: &GroupId, conn_id: &ConnectionId, sender: ConnectionSender) {
        self.rooms
            .entry(room_id.clone())
            .or_default()
            .insert(conn_id.clone(), sender);
        self.memberships
            .entry(conn_id.clone())
            .or_default()
            .insert(room_id.clone());
    }

    /// Remove a connection from a room. No-op if it was never a member.
    pub fn leave(&self, room_id: &GroupId, conn_id: &ConnectionId) {
        if let Some(mut members) = self.rooms.get_mut(room_id) {
            members.remove(conn_id);
            if members.is_empty() {
                drop(members);
                // re-checks emptiness under the shard lock, so a concurrent
                // join cannot be wiped out
                self.rooms.remove_if(room_id, |_, members| members.is_empty());
            }
        }
        if let Some(mut joined) = self.memberships.get_mut(conn_id) {
            joined.remove(room_id);
            if joined.is_empty() {
                drop(joined);
                self.memberships
                    .remove_if(conn_id, |_, joined| joined.is_empty());
            }
        }
    }

    /// Snapshot of a room's members. An empty room is a valid answer.
    pub fn members_of(&self, room_id: &GroupId) -> Vec<(ConnectionId, ConnectionSender)> {
        self.rooms
            .get(room_id)
            .map(|members| {
                members
                    .iter()
                    .map(|(id, tx)| (id.clone(), tx.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove a connection from every room it joined. Called on disconnect.
    pub fn drop_all(&self, conn_id: &ConnectionId) {
        let Some((_, joined)) = self.memberships.remove(conn_id) else {
            return;
        };
        for room_id in joined {
            if let Some(mut members) = self.rooms.get_mut(&room_id) {
                members.remove(conn_id);
                if members.is_empty() {
                    drop(members);
                    self.rooms.remove_if(&room_id, |_, members| members.is_empty());
                }
            }
        }
    }
}
