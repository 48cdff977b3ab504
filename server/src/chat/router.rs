//! Inbound event routing.
//!
//! One entry point per inbound event kind; each computes its set of
//! deliveries and fires them without waiting on any destination. The only
//! awaited work is read-receipt persistence, which must land before the
//! corresponding notification goes out.
//!
//! Routing rules:
//! - `joinRoom` / `leaveRoom` mutate room membership for this connection.
//! - `typing` / `stopTyping` expect exactly one of receiverId/groupId.
//!   Direct: unicast to the receiver if online, silently dropped otherwise.
//!   Group: multicast to the room, excluding the typist's own connection.
//! - `markAsRead` persists first; on failure the notification is suppressed
//!   and logged. Group receipts go to the room (excluding the reader),
//!   direct receipts go to the original sender if online.

use crate::chat::events::{ClientEvent, ServerEvent, TypingTarget};
use crate::chat::types::Message;
use crate::ids::{ConnectionId, GroupId, MessageId, UserId};
use crate::state::AppState;
use crate::ws::broadcast::{broadcast_to_room, send_to_user};
use crate::ws::ConnectionSender;

/// Identity and channel of the connection an event arrived on.
#[derive(Clone)]
pub struct EventOrigin {
    pub user_id: UserId,
    pub name: String,
    pub conn_id: ConnectionId,
    pub sender: ConnectionSender,
}

/// Route one inbound client event.
///
/// Events from a single connection are dispatched sequentially by its actor,
/// which preserves per-sender ordering across typing/message/read sequences.
pub async fn dispatch(state: &AppState, origin: &EventOrigin, event: ClientEvent) {
    match event {
        ClientEvent::JoinRoom { room_id } => {
            state
                .rooms
                .join(&room_id, &origin.conn_id, origin.sender.clone());
            tracing::debug!(user_id = %origin.user_id, room_id = %room_id, "Joined room");
        }
        ClientEvent::LeaveRoom { room_id } => {
            state.rooms.leave(&room_id, &origin.conn_id);
            tracing::debug!(user_id = %origin.user_id, room_id = %room_id, "Left room");
        }
        ClientEvent::Typing {
            receiver_id,
            group_id,
        } => {
            route_typing(state, origin, receiver_id, group_id, true);
        }
        ClientEvent::StopTyping {
            receiver_id,
            group_id,
        } => {
            route_typing(state, origin, receiver_id, group_id, false);
        }
        ClientEvent::MarkAsRead {
            message_ids,
            group_id,
            sender_id,
        } => {
            mark_as_read(state, origin, message_ids, group_id, sender_id).await;
        }
    }
}

fn route_typing(
    state: &AppState,
    origin: &EventOrigin,
    receiver_id: Option<UserId>,
    group_id: Option<GroupId>,
    started: bool,
) {
    let Some(target) = TypingTarget::from_ids(receiver_id, group_id) else {
        tracing::warn!(
            user_id = %origin.user_id,
            "Dropping typing event without exactly one destination"
        );
        return;
    };

    let event = if started {
        ServerEvent::Typing {
            user_id: origin.user_id.clone(),
            name: origin.name.clone(),
        }
    } else {
        ServerEvent::StopTyping {
            user_id: origin.user_id.clone(),
        }
    };

    match target {
        TypingTarget::Direct(receiver) => {
            send_to_user(&state.registry, &receiver, &event);
        }
        TypingTarget::Room(room_id) => {
            broadcast_to_room(&state.rooms, &room_id, Some(&origin.conn_id), &event);
        }
    }
}

async fn mark_as_read(
    state: &AppState,
    origin: &EventOrigin,
    message_ids: Vec<MessageId>,
    group_id: Option<GroupId>,
    sender_id: Option<UserId>,
) {
    if message_ids.is_empty() {
        tracing::warn!(user_id = %origin.user_id, "Dropping markAsRead with no message ids");
        return;
    }

    // Persist before notifying anyone.
    match state.store.mark_read(&message_ids, &origin.user_id).await {
        Ok(updated) => {
            if !updated {
                tracing::debug!(user_id = %origin.user_id, "Read receipts already recorded");
            }
        }
        Err(e) => {
            tracing::error!(
                user_id = %origin.user_id,
                error = %e,
                "Failed to persist read receipts; notification suppressed"
            );
            return;
        }
    }

    let event = ServerEvent::MessagesRead {
        message_ids,
        reader_id: origin.user_id.clone(),
    };

    // The two fan-outs are independent; a client normally supplies one id.
    // With neither, the receipt is persisted and nobody is notified.
    if let Some(sender) = sender_id {
        send_to_user(&state.registry, &sender, &event);
    }
    if let Some(room_id) = group_id {
        broadcast_to_room(&state.rooms, &room_id, Some(&origin.conn_id), &event);
    }
}

/// Live delivery for a just-persisted message. Invoked by the REST send
/// paths after a successful write.
///
/// Direct: unicast `newMessage` to the receiver if online. Group: multicast
/// `newGroupMessage` to the room, excluding the sender's own connection; the
/// HTTP response already carries the created message back to the sender.
pub fn deliver_new_message(state: &AppState, message: &Message) {
    if let Some(group_id) = &message.group_id {
        let except = state
            .registry
            .lookup(&message.sender_id)
            .map(|handle| handle.conn_id);
        broadcast_to_room(
            &state.rooms,
            group_id,
            except.as_ref(),
            &ServerEvent::NewGroupMessage(message.clone()),
        );
    } else if let Some(receiver_id) = &message.receiver_id {
        send_to_user(
            &state.registry,
            receiver_id,
            &ServerEvent::NewMessage(message.clone()),
        );
    }
}
