//! Outbound event encoding and fan-out.
//!
//! Every send here is fire-and-forget: a send failure means the connection's
//! actor is already tearing down, so errors are dropped rather than surfaced
//! to the event that triggered the delivery.

use axum::extract::ws::Message;

use super::registry::ConnectionRegistry;
use super::ConnectionSender;
use crate::chat::events::ServerEvent;
use crate::chat::rooms::RoomTracker;
use crate::ids::{ConnectionId, GroupId, UserId};

/// Encode a server event as a JSON text frame.
pub fn encode_event(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            None
        }
    }
}

/// Push one event to one connection.
pub fn send_to_conn(sender: &ConnectionSender, event: &ServerEvent) {
    if let Some(msg) = encode_event(event) {
        let _ = sender.send(msg);
    }
}

/// Unicast to a user's live connection. Silently dropped when offline.
pub fn send_to_user(registry: &ConnectionRegistry, user_id: &UserId, event: &ServerEvent) {
    if let Some(handle) = registry.lookup(user_id) {
        send_to_conn(&handle.sender, event);
    }
}

/// Broadcast an event to every live connection.
pub fn broadcast_to_all(registry: &ConnectionRegistry, event: &ServerEvent) {
    let Some(msg) = encode_event(event) else {
        return;
    };
    for sender in registry.senders() {
        let _ = sender.send(msg.clone());
    }
}

/// Multicast to every current member of a room, optionally skipping one
/// connection (the sender's own).
pub fn broadcast_to_room(
    rooms: &RoomTracker,
    room_id: &GroupId,
    except: Option<&ConnectionId>,
    event: &ServerEvent,
) {
    let Some(msg) = encode_event(event) else {
        return;
    };
    for (conn_id, sender) in rooms.members_of(room_id) {
        if Some(&conn_id) == except {
            continue;
        }
        let _ = sender.send(msg.clone());
    }
}
